//! Lowering of resource deltas into conversion statements.

use crdgen_model::{Names, Shape, ShapeKind, ShapeModel, ShapeRef};
use tracing::debug;

use super::annotation::{AnnotationTag, Section, annotation_key};
use super::ir::{ConversionFunction, DST, Direction, OBJECT_META, Place, SRC, Stmt, TypeExpr};
use crate::builder::{ApiModel, Field};
use crate::delta::{ChangeType, FieldDelta, ResourceDelta, Schema};
use crate::error::{GenerationError, GenerationResult};
use crate::registry::VersionedApi;
use crate::settings::GeneratorSettings;

/// One version taking part in a conversion.
#[derive(Debug, Clone, Copy)]
struct Side<'a> {
    version: &'a str,
    model: &'a ShapeModel,
    api: &'a ApiModel,
}

impl<'a> Side<'a> {
    fn new(api: &'a VersionedApi) -> Self {
        Self {
            version: &api.version,
            model: &api.model,
            api: &api.api,
        }
    }

    fn schema(&self) -> Schema<'a> {
        Schema::new(self.model, self.api)
    }
}

/// Generates conversion functions between one spoke version and the hub.
#[derive(Debug, Clone, Copy)]
pub struct ConversionGenerator<'a> {
    settings: &'a GeneratorSettings,
    spoke: Side<'a>,
    hub: Side<'a>,
}

impl<'a> ConversionGenerator<'a> {
    /// Create a generator for a spoke/hub pair.
    #[must_use]
    pub fn new(
        settings: &'a GeneratorSettings,
        spoke: &'a VersionedApi,
        hub: &'a VersionedApi,
    ) -> Self {
        Self {
            settings,
            spoke: Side::new(spoke),
            hub: Side::new(hub),
        }
    }

    /// Lower a resource delta into a conversion function for `direction`.
    pub fn generate(
        &self,
        delta: &ResourceDelta<'_>,
        direction: Direction,
    ) -> GenerationResult<ConversionFunction> {
        let (source, target) = match direction {
            Direction::ToHub => (self.spoke, self.hub),
            Direction::FromHub => (self.hub, self.spoke),
        };
        let mut ctx = CopyContext {
            source,
            target,
            package: match direction {
                Direction::ToHub => Some(self.hub.version.to_owned()),
                Direction::FromHub => None,
            },
            copying: Vec::new(),
        };

        let src = Place::var(SRC);
        let dst = Place::var(DST);
        let mut body = vec![Stmt::Assign {
            dst: dst.member(OBJECT_META),
            src: src.member(OBJECT_META),
        }];
        for builtin in &self.settings.builtin_status_fields {
            body.push(Stmt::Assign {
                dst: dst.member(Section::Status.member()).member(builtin.as_str()),
                src: src.member(Section::Status.member()).member(builtin.as_str()),
            });
        }

        for (section, deltas) in [(Section::Spec, &delta.spec), (Section::Status, &delta.status)] {
            for field_delta in deltas {
                let stmts = self.lower_delta(&mut ctx, section, field_delta, direction)?;
                body.extend(stmts);
            }
        }

        debug!(
            resource = %delta.resource,
            spoke = %self.spoke.version,
            ?direction,
            statements = body.len(),
            "generated conversion function"
        );
        Ok(ConversionFunction {
            direction,
            resource: Names::new(delta.resource.as_str()),
            body,
        })
    }

    fn lower_delta(
        &self,
        ctx: &mut CopyContext<'a>,
        section: Section,
        delta: &FieldDelta<'_>,
        direction: Direction,
    ) -> GenerationResult<Vec<Stmt>> {
        let src_root = Place::var(SRC).member(section.member());
        let dst_root = Place::var(DST).member(section.member());
        let unsupported = |reason: String| GenerationError::UnsupportedChange {
            field: delta.name().to_owned(),
            reason,
        };

        match (delta.change_type, delta.spoke, delta.hub) {
            (ChangeType::Intact | ChangeType::Renamed, Some(spoke), Some(hub)) => {
                let (from, to) = match direction {
                    Direction::ToHub => (spoke, hub),
                    Direction::FromHub => (hub, spoke),
                };
                if delta.change_type == ChangeType::Renamed && !self.same_shape(spoke, hub) {
                    return Err(unsupported(format!(
                        "renamed from {} with a different shape",
                        spoke.names.original
                    )));
                }
                let src = src_root.member(from.names.camel.as_str());
                let dst = dst_root.member(to.names.camel.as_str());
                match (&from.shape_ref, &to.shape_ref) {
                    (Some(from_ref), Some(to_ref)) if !from.is_secret() => {
                        ctx.copy_value(&src, &dst, from_ref, to_ref, &to.names.camel_lower, 1)
                    }
                    _ => Ok(vec![Stmt::Assign { dst, src }]),
                }
            }
            (ChangeType::Added, None, Some(hub)) => Ok(self.lower_one_sided(
                section,
                hub,
                self.hub,
                &src_root,
                &dst_root,
                direction == Direction::FromHub,
            )),
            (ChangeType::Removed, Some(spoke), None) => Ok(self.lower_one_sided(
                section,
                spoke,
                self.spoke,
                &src_root,
                &dst_root,
                direction == Direction::ToHub,
            )),
            (change_type, _, _) => Err(unsupported(change_type.to_string())),
        }
    }

    /// Encode a field present only on the source side, or decode a field
    /// present only on the destination side.
    fn lower_one_sided(
        &self,
        section: Section,
        field: &Field,
        owner: Side<'_>,
        src_root: &Place,
        dst_root: &Place,
        on_source_side: bool,
    ) -> Vec<Stmt> {
        let key = annotation_key(&self.settings.annotation_prefix, section, &field.names.camel);
        let tag = AnnotationTag::for_shape(owner.model, field.shape_ref.as_ref());
        let note = Stmt::Comment(format!(
            "{}.{} only exists in {}",
            section.member(),
            field.names.camel,
            owner.version
        ));
        if on_source_side {
            let value = src_root.member(field.names.camel.as_str());
            vec![
                note,
                Stmt::Guard {
                    cond: value.clone(),
                    body: vec![Stmt::EncodeAnnotation { key, tag, value }],
                },
            ]
        } else {
            vec![
                note,
                Stmt::DecodeAnnotation {
                    key,
                    tag,
                    target: dst_root.member(field.names.camel.as_str()),
                },
            ]
        }
    }

    fn same_shape(&self, spoke: &Field, hub: &Field) -> bool {
        match (&spoke.shape_ref, &hub.shape_ref) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                self.spoke.schema().compare(a, &self.hub.schema(), b) == ChangeType::Intact
            }
            _ => false,
        }
    }
}

/// Follow a reference, reporting a dangling one as a schema error.
fn resolve<'a>(model: &'a ShapeModel, shape_ref: &ShapeRef) -> GenerationResult<&'a Shape> {
    model
        .resolve(shape_ref)
        .map_err(|e| GenerationError::Schema(e.to_string()))
}

/// Shape and type information for copying values from one version to another.
#[derive(Debug, Clone)]
struct CopyContext<'a> {
    source: Side<'a>,
    target: Side<'a>,
    package: Option<String>,
    /// Structure shapes currently being copied, outermost first.
    copying: Vec<String>,
}

impl<'a> CopyContext<'a> {
    /// Statements copying `src` (a source-version value) into `dst`.
    fn copy_value(
        &mut self,
        src: &Place,
        dst: &Place,
        src_ref: &ShapeRef,
        dst_ref: &ShapeRef,
        collection: &str,
        depth: usize,
    ) -> GenerationResult<Vec<Stmt>> {
        let src_shape = resolve(self.source.model, src_ref)?;
        let dst_shape = resolve(self.target.model, dst_ref)?;

        match (&src_shape.kind, &dst_shape.kind) {
            (ShapeKind::Structure { .. }, ShapeKind::Structure { .. }) => {
                if self.copying.contains(&dst_shape.name) {
                    return Err(GenerationError::UnsupportedChange {
                        field: dst.to_string(),
                        reason: format!("recursive shape {}", dst_shape.name),
                    });
                }
                self.copying.push(dst_shape.name.clone());
                let var = format!("{}Copy{depth}", Names::new(dst_shape.name.as_str()).camel_lower);
                let mut body = vec![Stmt::Allocate {
                    var: var.clone(),
                    ty: self.type_expr(dst_ref)?,
                    len_of: None,
                }];
                let copy = Place::var(var.as_str());
                let src_members = self.source.schema().members(src_shape);
                let dst_members = self.target.schema().members(dst_shape);
                if let Some(member) = src_members
                    .keys()
                    .chain(dst_members.keys())
                    .find(|m| !src_members.contains_key(*m) || !dst_members.contains_key(*m))
                {
                    return Err(GenerationError::UnsupportedChange {
                        field: dst.to_string(),
                        reason: format!(
                            "member {member} of {} exists in one version only",
                            dst_shape.name
                        ),
                    });
                }
                for (member, &(dst_member_ref, dst_secret)) in &dst_members {
                    let &(src_member_ref, src_secret) = &src_members[member];
                    let names = Names::new(*member);
                    let from = src.member(names.camel.as_str());
                    let to = copy.member(names.camel.as_str());
                    match (src_secret, dst_secret) {
                        (true, true) => body.push(Stmt::Assign { dst: to, src: from }),
                        (false, false) => body.extend(self.copy_value(
                            &from,
                            &to,
                            src_member_ref,
                            dst_member_ref,
                            &names.camel_lower,
                            depth + 1,
                        )?),
                        _ => {
                            return Err(GenerationError::UnsupportedChange {
                                field: to.to_string(),
                                reason: "secret reference on one side only".to_owned(),
                            });
                        }
                    }
                }
                body.push(Stmt::Assign {
                    dst: dst.clone(),
                    src: copy,
                });
                self.copying.pop();
                Ok(vec![Stmt::Guard {
                    cond: src.clone(),
                    body,
                }])
            }
            (ShapeKind::List { member: src_elem }, ShapeKind::List { member: dst_elem }) => {
                if self.source.model.is_scalar_only(src_ref) {
                    return Ok(vec![Stmt::Assign {
                        dst: dst.clone(),
                        src: src.clone(),
                    }]);
                }
                let var = format!("{}Copy{depth}", Names::new(dst_shape.name.as_str()).camel_lower);
                let elem = format!("{collection}Elem{depth}");
                let holder = format!("{collection}ElemCopy{depth}");
                let mut loop_body = vec![Stmt::Declare {
                    var: holder.clone(),
                    ty: self.type_expr(dst_elem)?,
                }];
                loop_body.extend(self.copy_value(
                    &Place::var(elem.as_str()),
                    &Place::var(holder.as_str()),
                    src_elem,
                    dst_elem,
                    &elem,
                    depth + 1,
                )?);
                loop_body.push(Stmt::Append {
                    list: var.clone(),
                    value: Place::var(holder),
                });
                Ok(vec![Stmt::Guard {
                    cond: src.clone(),
                    body: vec![
                        Stmt::Allocate {
                            var: var.clone(),
                            ty: self.type_expr(dst_ref)?,
                            len_of: Some(src.clone()),
                        },
                        Stmt::ForEachList {
                            elem,
                            list: src.clone(),
                            body: loop_body,
                        },
                        Stmt::Assign {
                            dst: dst.clone(),
                            src: Place::var(var),
                        },
                    ],
                }])
            }
            (
                ShapeKind::Map { value: src_val, .. },
                ShapeKind::Map { value: dst_val, .. },
            ) => {
                if self.source.model.is_scalar_only(src_ref) {
                    return Ok(vec![Stmt::Assign {
                        dst: dst.clone(),
                        src: src.clone(),
                    }]);
                }
                let var = format!("{}Copy{depth}", Names::new(dst_shape.name.as_str()).camel_lower);
                let key = format!("{collection}Key{depth}");
                let val = format!("{collection}Val{depth}");
                let holder = format!("{collection}ElemCopy{depth}");
                let mut loop_body = vec![Stmt::Declare {
                    var: holder.clone(),
                    ty: self.type_expr(dst_val)?,
                }];
                loop_body.extend(self.copy_value(
                    &Place::var(val.as_str()),
                    &Place::var(holder.as_str()),
                    src_val,
                    dst_val,
                    &val,
                    depth + 1,
                )?);
                loop_body.push(Stmt::Insert {
                    map: var.clone(),
                    key: Place::var(key.as_str()),
                    value: Place::var(holder),
                });
                Ok(vec![Stmt::Guard {
                    cond: src.clone(),
                    body: vec![
                        Stmt::Allocate {
                            var: var.clone(),
                            ty: self.type_expr(dst_ref)?,
                            len_of: Some(src.clone()),
                        },
                        Stmt::ForEachMap {
                            key,
                            val,
                            map: src.clone(),
                            body: loop_body,
                        },
                        Stmt::Assign {
                            dst: dst.clone(),
                            src: Place::var(var),
                        },
                    ],
                }])
            }
            (ShapeKind::Scalar { .. }, ShapeKind::Scalar { .. }) => Ok(vec![Stmt::Assign {
                dst: dst.clone(),
                src: src.clone(),
            }]),
            _ => Err(GenerationError::UnsupportedChange {
                field: dst.to_string(),
                reason: format!(
                    "shape {} cannot be copied into {}",
                    src_shape.name, dst_shape.name
                ),
            }),
        }
    }

    /// The destination-version type of a shape.
    fn type_expr(&self, shape_ref: &ShapeRef) -> GenerationResult<TypeExpr> {
        let shape = resolve(self.target.model, shape_ref)?;
        Ok(match &shape.kind {
            ShapeKind::Scalar { scalar } => TypeExpr::Scalar(*scalar),
            ShapeKind::Structure { .. } => TypeExpr::Named {
                package: self.package.clone(),
                name: self
                    .target
                    .api
                    .type_renames
                    .get(&shape.name)
                    .cloned()
                    .unwrap_or_else(|| Names::new(shape.name.as_str()).camel),
            },
            ShapeKind::List { member } => TypeExpr::List(Box::new(self.type_expr(member)?)),
            ShapeKind::Map { key, value } => TypeExpr::Map(
                Box::new(self.type_expr(key)?),
                Box::new(self.type_expr(value)?),
            ),
        })
    }
}
