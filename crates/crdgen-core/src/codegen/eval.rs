//! Reference evaluator for conversion functions.
//!
//! Executes the IR over `serde_json::Value` objects, with `null` standing in
//! for an unset pointer. Reading through an unset member yields `null`;
//! writing `null` removes the member and never creates parents.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::annotation::{self, AnnotationError, AnnotationTag};
use super::ir::{ANNOTATIONS, ConversionFunction, DST, OBJECT_META, Place, SRC, Stmt, TypeExpr};

static NULL: Value = Value::Null;

/// Errors raised while evaluating a conversion function.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// A place refers to a variable that is not in scope.
    #[error("unbound variable {0}")]
    UnboundVariable(String),

    /// The source object cannot be written.
    #[error("cannot write to {0}")]
    ReadOnly(String),

    /// A member access went through a non-object value.
    #[error("{0} is not an object")]
    NotAnObject(String),

    /// A list operation found a non-list value.
    #[error("{0} is not a list")]
    NotAList(String),

    /// A map operation found a non-map value or a non-string key.
    #[error("{0} is not a map")]
    NotAMap(String),

    /// An annotation value is not a string.
    #[error("annotation {0} is not a string")]
    NotAString(String),

    /// The annotation codec rejected a value.
    #[error(transparent)]
    Annotation(#[from] AnnotationError),

    /// A decoded annotation carries a different tag than expected.
    #[error("annotation {key} has tag {found}, expected {expected}")]
    TagMismatch {
        /// Annotation key.
        key: String,
        /// Tag the function expects.
        expected: AnnotationTag,
        /// Tag found in the annotation.
        found: AnnotationTag,
    },
}

/// Run `function` against `src` and return the produced destination object.
pub fn evaluate(function: &ConversionFunction, src: &Value) -> Result<Value, EvalError> {
    let mut machine = Machine {
        src,
        dst: Value::Object(Map::new()),
        scopes: Vec::new(),
    };
    machine.block(&function.body)?;
    Ok(machine.dst)
}

#[derive(Debug)]
struct Machine<'s> {
    src: &'s Value,
    dst: Value,
    scopes: Vec<BTreeMap<String, Value>>,
}

impl Machine<'_> {
    fn block(&mut self, stmts: &[Stmt]) -> Result<(), EvalError> {
        self.scopes.push(BTreeMap::new());
        let result = stmts.iter().try_for_each(|stmt| self.stmt(stmt));
        self.scopes.pop();
        result
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<(), EvalError> {
        match stmt {
            Stmt::Comment(_) => Ok(()),
            Stmt::Assign { dst, src } => {
                let value = self.read(src)?;
                self.write(dst, value)
            }
            Stmt::Allocate { var, ty, .. } => {
                let value = match ty {
                    TypeExpr::List(_) => Value::Array(Vec::new()),
                    TypeExpr::Scalar(_) => Value::Null,
                    TypeExpr::Named { .. } | TypeExpr::Map(..) => {
                        Value::Object(Map::new())
                    }
                };
                self.define(var, value);
                Ok(())
            }
            Stmt::Declare { var, .. } => {
                self.define(var, Value::Null);
                Ok(())
            }
            Stmt::Guard { cond, body } => {
                if self.read(cond)?.is_null() {
                    return Ok(());
                }
                self.block(body)
            }
            Stmt::ForEachList { elem, list, body } => {
                let elems = match self.read(list)? {
                    Value::Null => return Ok(()),
                    Value::Array(elems) => elems,
                    _ => return Err(EvalError::NotAList(list.to_string())),
                };
                for value in elems {
                    self.scopes.push(BTreeMap::from([(elem.clone(), value)]));
                    let result = self.block(body);
                    self.scopes.pop();
                    result?;
                }
                Ok(())
            }
            Stmt::ForEachMap { key, val, map, body } => {
                let entries = match self.read(map)? {
                    Value::Null => return Ok(()),
                    Value::Object(entries) => entries,
                    _ => return Err(EvalError::NotAMap(map.to_string())),
                };
                for (k, v) in entries {
                    self.scopes
                        .push(BTreeMap::from([(key.clone(), Value::String(k)), (val.clone(), v)]));
                    let result = self.block(body);
                    self.scopes.pop();
                    result?;
                }
                Ok(())
            }
            Stmt::Append { list, value } => {
                let value = self.read(value)?;
                match self.root_mut(list)? {
                    Value::Array(elems) => {
                        elems.push(value);
                        Ok(())
                    }
                    _ => Err(EvalError::NotAList(list.clone())),
                }
            }
            Stmt::Insert { map, key, value } => {
                let Value::String(key) = self.read(key)? else {
                    return Err(EvalError::NotAMap(map.clone()));
                };
                let value = self.read(value)?;
                match self.root_mut(map)? {
                    Value::Object(entries) => {
                        entries.insert(key, value);
                        Ok(())
                    }
                    _ => Err(EvalError::NotAMap(map.clone())),
                }
            }
            Stmt::EncodeAnnotation { key, tag, value } => {
                let value = self.read(value)?;
                if value.is_null() {
                    return Ok(());
                }
                let encoded = annotation::encode(*tag, &value)?;
                self.write(&annotations().member(key.as_str()), Value::String(encoded))
            }
            Stmt::DecodeAnnotation { key, tag, target } => self.decode(key, *tag, target),
        }
    }

    /// Move an annotation of the destination into `target`.
    fn decode(&mut self, key: &str, tag: AnnotationTag, target: &Place) -> Result<(), EvalError> {
        let place = annotations().member(key);
        let raw = match self.read(&place)? {
            Value::Null => return Ok(()),
            Value::String(raw) => raw,
            _ => return Err(EvalError::NotAString(key.to_owned())),
        };
        let (found, value) = annotation::decode(&raw)?;
        if found != tag {
            return Err(EvalError::TagMismatch {
                key: key.to_owned(),
                expected: tag,
                found,
            });
        }
        self.write(target, value)?;
        self.write(&place, Value::Null)?;
        if self.read(&annotations())?.as_object().is_some_and(Map::is_empty) {
            self.write(&annotations(), Value::Null)?;
        }
        Ok(())
    }

    fn define(&mut self, var: &str, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(var.to_owned(), value);
        }
    }

    fn root(&self, name: &str) -> Result<&Value, EvalError> {
        if let Some(value) = self.scopes.iter().rev().find_map(|scope| scope.get(name)) {
            return Ok(value);
        }
        match name {
            SRC => Ok(self.src),
            DST => Ok(&self.dst),
            _ => Err(EvalError::UnboundVariable(name.to_owned())),
        }
    }

    fn root_mut(&mut self, name: &str) -> Result<&mut Value, EvalError> {
        if let Some(i) = self.scopes.iter().rposition(|scope| scope.contains_key(name)) {
            return self.scopes[i]
                .get_mut(name)
                .ok_or_else(|| EvalError::UnboundVariable(name.to_owned()));
        }
        match name {
            DST => Ok(&mut self.dst),
            SRC => Err(EvalError::ReadOnly(name.to_owned())),
            _ => Err(EvalError::UnboundVariable(name.to_owned())),
        }
    }

    fn read(&self, place: &Place) -> Result<Value, EvalError> {
        let (root, path) = place.split();
        let mut current = self.root(root)?;
        for member in path {
            current = match current {
                Value::Null => return Ok(Value::Null),
                Value::Object(map) => map.get(member).unwrap_or(&NULL),
                _ => return Err(EvalError::NotAnObject(place.to_string())),
            };
        }
        Ok(current.clone())
    }

    fn write(&mut self, place: &Place, value: Value) -> Result<(), EvalError> {
        let (root, path) = place.split();
        let remove = value.is_null();
        let mut current = self.root_mut(root)?;
        let Some((last, parents)) = path.split_last() else {
            *current = value;
            return Ok(());
        };
        for member in parents {
            if current.is_null() {
                if remove {
                    return Ok(());
                }
                *current = Value::Object(Map::new());
            }
            let Value::Object(map) = current else {
                return Err(EvalError::NotAnObject(place.to_string()));
            };
            current = if remove {
                match map.get_mut(*member) {
                    Some(next) => next,
                    None => return Ok(()),
                }
            } else {
                map.entry(*member).or_insert(Value::Null)
            };
        }
        if current.is_null() {
            if remove {
                return Ok(());
            }
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return Err(EvalError::NotAnObject(place.to_string()));
        };
        if remove {
            map.remove(*last);
        } else {
            map.insert((*last).to_owned(), value);
        }
        Ok(())
    }
}

fn annotations() -> Place {
    Place::var(DST).member(OBJECT_META).member(ANNOTATIONS)
}
