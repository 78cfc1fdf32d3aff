//! SQL and stored-procedure access: `readsFrom`, `writesTo`, `deletesFrom`,
//! `invokesProcedure`.

use super::{
    link_files, record_failure, web_path, LinkConfidence, LinkContext, LinkError, LinkOutput,
    LinkerKind, LinkerPlugin,
};
use legacymap_model::{
    ids, ConfigDetails, Entity, EntityKind, Evidence, FileRef, JavaDetails, JspDetails, Relation,
    RelationKind, SourceFile, SqlStatement,
};

pub const SQL_MAPPING: &str = "sql_mapping";

pub struct DataAccessLinker;

impl LinkerPlugin for DataAccessLinker {
    fn kind(&self) -> LinkerKind {
        LinkerKind::DataAccess
    }

    fn apply(&self, ctx: &LinkContext<'_>) -> LinkOutput {
        let confidence = ctx.confidence;

        let java = ctx.inventory.java_files();
        let mut out = link_files(self.kind(), &java, |file, details| {
            Ok(link_java(file, details, confidence))
        });

        let jsp = ctx.inventory.jsp_files();
        out.merge(link_files(self.kind(), &jsp, |file, details| {
            Ok(link_jsp(file, details, confidence))
        }));

        let configs = ctx.inventory.config_files();
        for (file, details) in &configs {
            out.merge(link_mapper_config(self.kind(), file, details, confidence));
        }

        tracing::info!(
            tables = out
                .entities
                .values()
                .filter(|e| e.kind == EntityKind::Table)
                .count(),
            edges = out.relations.len(),
            "linked data access"
        );
        out
    }
}

/// CRUD relation for a SQL verb; `None` for statements that touch no table data.
pub fn crud_kind(operation: &str) -> Option<RelationKind> {
    match operation.trim().to_ascii_uppercase().as_str() {
        "SELECT" => Some(RelationKind::ReadsFrom),
        "INSERT" | "UPDATE" | "MERGE" | "REPLACE" => Some(RelationKind::WritesTo),
        "DELETE" | "TRUNCATE" => Some(RelationKind::DeletesFrom),
        _ => None,
    }
}

fn emit_statement(
    out: &mut LinkOutput,
    from_id: &str,
    stmt: &SqlStatement,
    file: &SourceFile,
    confidence: f64,
) {
    let Some(kind) = crud_kind(&stmt.operation) else {
        return;
    };
    for name in stmt.tables.iter().filter(|t| !t.trim().is_empty()) {
        let table = Entity::table(name).with_source(FileRef {
            path: file.path.clone(),
            line: stmt.line,
        });
        out.add_relation(
            Relation::new(
                from_id.to_string(),
                kind,
                table.id.clone(),
                confidence,
                format!("{} on {}", stmt.operation.trim().to_ascii_uppercase(), table.name),
            )
            .with_evidence(Evidence::file(file.path.clone()).at_line(stmt.line)),
        );
        out.add_entity(table);
    }
}

fn link_java(file: &SourceFile, details: &JavaDetails, confidence: &LinkConfidence) -> LinkOutput {
    let mut out = LinkOutput::default();
    for class in &details.classes {
        let package = class.package.as_deref().or(details.package.as_deref());
        for method in &class.methods {
            if method.sql_statements.is_empty() && method.procedure_calls.is_empty() {
                continue;
            }
            let handler = Entity::java_method(package, &class.name, &method.name)
                .with_source(FileRef::new(file.path.clone()));

            for stmt in &method.sql_statements {
                emit_statement(&mut out, &handler.id, stmt, file, confidence.data_access);
            }
            for call in method.procedure_calls.iter().filter(|c| !c.name.trim().is_empty()) {
                let procedure = Entity::procedure(&call.name).with_source(FileRef {
                    path: file.path.clone(),
                    line: call.line,
                });
                out.add_relation(
                    Relation::new(
                        handler.id.clone(),
                        RelationKind::InvokesProcedure,
                        procedure.id.clone(),
                        confidence.procedure,
                        format!("calls stored procedure {}", procedure.name),
                    )
                    .with_evidence(Evidence::file(file.path.clone()).at_line(call.line)),
                );
                out.add_entity(procedure);
            }
            out.add_method(handler);
        }
    }
    out
}

fn link_jsp(file: &SourceFile, details: &JspDetails, confidence: &LinkConfidence) -> LinkOutput {
    let mut out = LinkOutput::default();
    let screen_id = ids::jsp_id(&web_path(&file.path));
    for stmt in &details.sql_statements {
        emit_statement(&mut out, &screen_id, stmt, file, confidence.data_access);
    }
    out
}

/// MyBatis/iBATIS mapper statements: `from_reference` = mapper member,
/// `to_reference` = comma-separated tables, `operation` attribute = SQL verb.
fn link_mapper_config(
    linker: LinkerKind,
    file: &SourceFile,
    details: &ConfigDetails,
    confidence: &LinkConfidence,
) -> LinkOutput {
    let mut out = LinkOutput::default();
    for mapping in details
        .code_mappings
        .iter()
        .filter(|m| m.mapping_type == SQL_MAPPING)
    {
        let resolved = ids::split_member_reference(&mapping.from_reference)
            .ok_or_else(|| LinkError::UnresolvableReference(mapping.from_reference.clone()))
            .and_then(|member| {
                let operation = mapping
                    .attr("operation")
                    .ok_or_else(|| {
                        LinkError::malformed(SQL_MAPPING, "missing operation attribute")
                    })?;
                Ok((member, operation))
            });
        let (member, operation) = match resolved {
            Ok(ok) => ok,
            Err(err) => {
                record_failure(&mut out, linker, &file.path, mapping.from_reference.clone(), &err);
                continue;
            }
        };

        let handler = Entity::java_method(member.package.as_deref(), &member.class, &member.member)
            .with_source(FileRef {
                path: file.path.clone(),
                line: mapping.line,
            });
        let stmt = SqlStatement {
            operation: operation.to_string(),
            tables: mapping
                .to_reference
                .split(',')
                .map(|t| t.trim().to_string())
                .collect(),
            line: mapping.line,
        };
        emit_statement(&mut out, &handler.id, &stmt, file, confidence.data_access);
        out.add_method(handler);
    }
    out
}
