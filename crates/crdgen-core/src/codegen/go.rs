//! Go rendering of conversion functions.
//!
//! Files follow the controller-runtime conversion convention: spoke types get
//! `ConvertTo`/`ConvertFrom` methods against the hub type, and the hub type
//! gets an empty `Hub()` marker method.

use std::collections::BTreeSet;
use std::fmt::Write;

use crdgen_model::{Names, ScalarKind};

use super::ir::{ConversionFunction, DST, Direction, SRC, Stmt, TypeExpr};
use crate::error::GenerationResult;
use crate::settings::GeneratorSettings;

/// Header comment placed at the top of every generated file.
const FILE_HEADER: &str = "// Code generated by crdgen. DO NOT EDIT.";

const CTRL_CONVERSION_ALIAS: &str = "ctrlrtconversion";
const CTRL_CONVERSION_PATH: &str = "sigs.k8s.io/controller-runtime/pkg/conversion";
const ACK_CONVERSION_ALIAS: &str = "ackconversion";
const METAV1_ALIAS: &str = "metav1";
const METAV1_PATH: &str = "k8s.io/apimachinery/pkg/apis/meta/v1";

/// The conversion functions of one resource in one spoke version.
#[derive(Debug, Clone)]
pub struct ConversionFile {
    /// Spoke package name (the spoke version).
    pub package: String,
    /// Hub package name (the hub version).
    pub hub_package: String,
    /// The converted resource.
    pub resource: Names,
    /// `ConvertTo` and `ConvertFrom` bodies.
    pub functions: Vec<ConversionFunction>,
}

/// Renders conversion functions to target source code.
pub trait Backend {
    /// File extension of rendered files, without the dot.
    fn file_extension(&self) -> &'static str;

    /// Render the conversion methods of a spoke resource.
    fn render_conversion_file(&self, file: &ConversionFile) -> GenerationResult<String>;

    /// Render the hub marker of a hub resource.
    fn render_hub_file(&self, package: &str, resource: &Names) -> GenerationResult<String>;
}

/// The Go backend.
#[derive(Debug, Clone)]
pub struct GoBackend {
    settings: GeneratorSettings,
}

impl GoBackend {
    /// Create a Go backend.
    #[must_use]
    pub fn new(settings: GeneratorSettings) -> Self {
        Self { settings }
    }
}

impl Backend for GoBackend {
    fn file_extension(&self) -> &'static str {
        "go"
    }

    fn render_conversion_file(&self, file: &ConversionFile) -> GenerationResult<String> {
        let mut writer = GoWriter::default();
        writer.import(CTRL_CONVERSION_ALIAS, CTRL_CONVERSION_PATH);
        writer.import(
            &file.hub_package,
            &format!("{}/{}", self.settings.api_module_path, file.hub_package),
        );
        if file.functions.iter().any(ConversionFunction::uses_annotations) {
            writer.import(ACK_CONVERSION_ALIAS, &self.settings.runtime_import_path);
        }

        for (i, function) in file.functions.iter().enumerate() {
            if i > 0 {
                writer.blank()?;
            }
            writer.function(function, &file.hub_package)?;
        }

        let mut out = String::with_capacity(4 * 1024);
        writeln!(out, "{FILE_HEADER}")?;
        writeln!(out)?;
        writeln!(out, "package {}", file.package)?;
        writeln!(out)?;
        writeln!(out, "import (")?;
        for (alias, path) in &writer.imports {
            writeln!(out, "\t{alias} {}", go_quote(path))?;
        }
        writeln!(out, ")")?;
        writeln!(out)?;
        out.push_str(&writer.out);
        Ok(out)
    }

    fn render_hub_file(&self, package: &str, resource: &Names) -> GenerationResult<String> {
        let mut out = String::new();
        writeln!(out, "{FILE_HEADER}")?;
        writeln!(out)?;
        writeln!(out, "package {package}")?;
        writeln!(out)?;
        writeln!(out, "// Hub marks this type as a conversion hub.")?;
        writeln!(out, "func (*{}) Hub() {{}}", resource.camel)?;
        Ok(out)
    }
}

/// Accumulates a function body and the imports it needs.
#[derive(Debug, Default)]
struct GoWriter {
    out: String,
    indent: usize,
    imports: BTreeSet<(String, String)>,
}

impl GoWriter {
    fn import(&mut self, alias: &str, path: &str) {
        self.imports.insert((alias.to_owned(), path.to_owned()));
    }

    fn line(&mut self, text: &str) -> std::fmt::Result {
        for _ in 0..self.indent {
            self.out.push('\t');
        }
        writeln!(self.out, "{text}")
    }

    fn blank(&mut self) -> std::fmt::Result {
        writeln!(self.out)
    }

    fn open(&mut self, text: &str) -> std::fmt::Result {
        self.line(text)?;
        self.indent += 1;
        Ok(())
    }

    fn close(&mut self) -> std::fmt::Result {
        self.indent -= 1;
        self.line("}")
    }

    fn function(&mut self, function: &ConversionFunction, hub: &str) -> std::fmt::Result {
        let kind = &function.resource.camel;
        match function.direction {
            Direction::ToHub => {
                self.open(&format!(
                    "func ({SRC} *{kind}) ConvertTo({DST}Raw {CTRL_CONVERSION_ALIAS}.Hub) error {{"
                ))?;
                self.line(&format!("{DST} := {DST}Raw.(*{hub}.{kind})"))?;
            }
            Direction::FromHub => {
                self.open(&format!(
                    "func ({DST} *{kind}) ConvertFrom({SRC}Raw {CTRL_CONVERSION_ALIAS}.Hub) error {{"
                ))?;
                self.line(&format!("{SRC} := {SRC}Raw.(*{hub}.{kind})"))?;
            }
        }
        self.stmts(&function.body)?;
        self.line("return nil")?;
        self.close()
    }

    fn stmts(&mut self, stmts: &[Stmt]) -> std::fmt::Result {
        stmts.iter().try_for_each(|stmt| self.stmt(stmt))
    }

    fn stmt(&mut self, stmt: &Stmt) -> std::fmt::Result {
        match stmt {
            Stmt::Comment(text) => self.line(&format!("// {text}")),
            Stmt::Assign { dst, src } => self.line(&format!("{dst} = {src}")),
            Stmt::Allocate { var, ty, len_of } => {
                let value = match (ty, len_of) {
                    (TypeExpr::List(_) | TypeExpr::Map(..), Some(len)) => {
                        let ty = self.type_name(ty, false);
                        if ty.starts_with("[]") {
                            format!("make({ty}, 0, len({len}))")
                        } else {
                            format!("make({ty}, len({len}))")
                        }
                    }
                    (TypeExpr::List(_) | TypeExpr::Map(..), None) => {
                        format!("{}{{}}", self.type_name(ty, false))
                    }
                    _ => format!("&{}{{}}", self.type_name(ty, false)),
                };
                self.line(&format!("{var} := {value}"))
            }
            Stmt::Declare { var, ty } => {
                let ty = self.type_name(ty, true);
                self.line(&format!("var {var} {ty}"))
            }
            Stmt::Guard { cond, body } => {
                self.open(&format!("if {cond} != nil {{"))?;
                self.stmts(body)?;
                self.close()
            }
            Stmt::ForEachList { elem, list, body } => {
                self.open(&format!("for _, {elem} := range {list} {{"))?;
                self.stmts(body)?;
                self.close()
            }
            Stmt::ForEachMap { key, val, map, body } => {
                self.open(&format!("for {key}, {val} := range {map} {{"))?;
                self.stmts(body)?;
                self.close()
            }
            Stmt::Append { list, value } => self.line(&format!("{list} = append({list}, {value})")),
            Stmt::Insert { map, key, value } => self.line(&format!("{map}[{key}] = {value}")),
            Stmt::EncodeAnnotation { key, tag, value } => self.checked(&format!(
                "{ACK_CONVERSION_ALIAS}.AnnotateField(&{DST}.ObjectMeta, {}, {}, {value})",
                go_quote(key),
                go_quote(tag.as_str()),
            )),
            Stmt::DecodeAnnotation { key, tag, target } => self.checked(&format!(
                "{ACK_CONVERSION_ALIAS}.DecodeFieldAnnotation(&{DST}.ObjectMeta, {}, {}, &{target})",
                go_quote(key),
                go_quote(tag.as_str()),
            )),
        }
    }

    /// A call returning an error that aborts the conversion.
    fn checked(&mut self, call: &str) -> std::fmt::Result {
        self.open(&format!("if err := {call}; err != nil {{"))?;
        self.line("return err")?;
        self.close()
    }

    /// Go spelling of a type; `pointer` selects the field form of scalars
    /// and structures.
    fn type_name(&mut self, ty: &TypeExpr, pointer: bool) -> String {
        let star = if pointer { "*" } else { "" };
        match ty {
            TypeExpr::Scalar(ScalarKind::Blob) => "[]byte".to_owned(),
            TypeExpr::Scalar(ScalarKind::Timestamp) => {
                self.import(METAV1_ALIAS, METAV1_PATH);
                format!("{star}{METAV1_ALIAS}.Time")
            }
            TypeExpr::Scalar(scalar) => format!("{star}{}", go_scalar(*scalar)),
            TypeExpr::Named { package, name } => match package {
                Some(package) => format!("{star}{package}.{name}"),
                None => format!("{star}{name}"),
            },
            TypeExpr::List(elem) => format!("[]{}", self.type_name(elem, true)),
            TypeExpr::Map(key, value) => {
                format!("map[{}]{}", self.type_name(key, false), self.type_name(value, true))
            }
        }
    }
}

fn go_scalar(scalar: ScalarKind) -> &'static str {
    match scalar {
        ScalarKind::Boolean => "bool",
        ScalarKind::String | ScalarKind::Character => "string",
        ScalarKind::Byte | ScalarKind::Short | ScalarKind::Integer | ScalarKind::Long => "int64",
        ScalarKind::Float | ScalarKind::Double => "float64",
        ScalarKind::Timestamp => "metav1.Time",
        ScalarKind::Blob => "[]byte",
    }
}

/// A Go interpreted string literal.
fn go_quote(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    for c in raw.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
