use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use daybook_io::{read_import_file, CsvLedger};
use daybook_model::{encode_note, FieldKind, FieldValue, Schema};
use daybook_store::{EditDraft, LedgerSession, OpenNotice, SubmitKind};

#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "daybook",
    about = "Record daily sales-tax invoice line items in a CSV ledger."
)]
pub struct Args {
    /// Ledger file to operate on.
    #[arg(long, default_value = "daybook.csv", global = true)]
    file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Append a new line item.
    Add {
        /// Field values as `name=value` pairs (unknown names are rejected).
        #[arg(value_parser = parse_field_pair, required = true)]
        fields: Vec<(String, String)>,

        /// Remark category (one of the schema's fixed list).
        #[arg(long)]
        note_category: Option<String>,

        /// Remark free-text detail.
        #[arg(long)]
        note_detail: Option<String>,
    },
    /// Print the ledger with row positions.
    List {
        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Update the row at a position printed by `list`.
    Edit {
        index: usize,

        /// Field overrides as `name=value` pairs; unset fields keep their
        /// current values.
        #[arg(value_parser = parse_field_pair)]
        fields: Vec<(String, String)>,

        /// Replace the remark category.
        #[arg(long)]
        note_category: Option<String>,

        /// Replace the remark detail.
        #[arg(long)]
        note_detail: Option<String>,
    },
    /// Delete the row at a position printed by `list`.
    Delete { index: usize },
    /// Merge rows from another CSV file (deduplicated by invoice identity).
    Import { path: PathBuf },
    /// Write the ledger out to another CSV file.
    Export { path: PathBuf },
}

pub fn run() -> Result<()> {
    run_with_args(Args::parse())
}

pub fn run_with_args(args: Args) -> Result<()> {
    let schema = Schema::daily_sales();
    let store = CsvLedger::new(&args.file);
    let (mut session, notice) = LedgerSession::open(store, schema);

    match notice {
        Some(OpenNotice::CreatedNew) => {
            // Only worth mentioning for commands that expect existing rows.
            if !matches!(args.command, Command::Add { .. }) {
                eprintln!("note: {}", OpenNotice::CreatedNew);
            }
        }
        Some(notice @ OpenNotice::RecoveredUnreadable { .. }) => {
            eprintln!("warning: {notice}");
        }
        None => {}
    }

    match args.command {
        Command::Add {
            fields,
            note_category,
            note_detail,
        } => {
            let candidate = build_candidate(
                session.schema(),
                &fields,
                note_category.as_deref(),
                note_detail.as_deref(),
                None,
            )?;
            let outcome = session.submit(&candidate)?;
            println!("added 1 row ({} total)", outcome.rows);
        }
        Command::List { format } => print_table(&session, format)?,
        Command::Edit {
            index,
            fields,
            note_category,
            note_detail,
        } => {
            let draft = session.begin_edit(index)?;
            let candidate = build_candidate(
                session.schema(),
                &fields,
                note_category.as_deref(),
                note_detail.as_deref(),
                Some(&draft),
            )?;
            let outcome = session.submit(&candidate)?;
            debug_assert_eq!(outcome.kind, SubmitKind::Updated);
            println!("updated row {index} ({} total)", outcome.rows);
        }
        Command::Delete { index } => {
            let rows = session.delete(index)?;
            println!("deleted row {index} ({rows} remaining)");
        }
        Command::Import { path } => {
            let incoming = read_import_file(&path)
                .with_context(|| format!("read import file {}", path.display()))?;
            let outcome = session.merge_import(&incoming)?;
            println!(
                "merged {} rows, dropped {} duplicates ({} total)",
                outcome.appended, outcome.dropped, outcome.rows
            );
        }
        Command::Export { path } => {
            let mut target = CsvLedger::new(&path);
            session.export_to(&mut target)?;
            println!(
                "exported {} rows to {}",
                session.table().len(),
                path.display()
            );
        }
    }

    Ok(())
}

/// Parse a `name=value` argument.
fn parse_field_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected `name=value`, got `{raw}`")),
    }
}

/// Assemble a candidate row from `name=value` pairs, optionally layered on
/// top of an edit draft, with the note field composed through the codec.
fn build_candidate(
    schema: &Schema,
    fields: &[(String, String)],
    note_category: Option<&str>,
    note_detail: Option<&str>,
    draft: Option<&EditDraft>,
) -> Result<Vec<(String, FieldValue)>> {
    let mut candidate: Vec<(String, FieldValue)> = match draft {
        Some(draft) => draft.fields.clone(),
        None => Vec::new(),
    };

    let note_field = schema.note_field_index().map(|i| &schema.fields()[i].name);

    for (name, value) in fields {
        let Some(field) = schema.field(name) else {
            bail!(
                "unknown field `{name}` (expected one of: {})",
                schema
                    .fields()
                    .iter()
                    .map(|f| f.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        };
        if let FieldKind::Choice(options) = &field.kind {
            if !value.is_empty() && !field.kind.accepts_choice(value) {
                bail!(
                    "`{name}` must be one of: {} (got `{value}`)",
                    options.join(", ")
                );
            }
        }
        set_field(&mut candidate, name, FieldValue::Text(value.clone()));
    }

    if note_category.is_some() || note_detail.is_some() {
        let Some(note_field) = note_field else {
            bail!("this ledger has no remark field");
        };
        let current = draft.and_then(|d| d.note.clone()).unwrap_or_default();
        let category = note_category.unwrap_or(&current.category);
        let detail = note_detail.unwrap_or(&current.detail);
        if !category.is_empty() && !schema.note_categories().iter().any(|c| c == category) {
            bail!(
                "remark category must be one of: {} (got `{category}`)",
                schema.note_categories().join(", ")
            );
        }
        set_field(
            &mut candidate,
            note_field,
            FieldValue::Text(encode_note(category, detail)),
        );
    }

    Ok(candidate)
}

fn set_field(candidate: &mut Vec<(String, FieldValue)>, name: &str, value: FieldValue) {
    match candidate.iter_mut().find(|(n, _)| n == name) {
        Some((_, slot)) => *slot = value,
        None => candidate.push((name.to_string(), value)),
    }
}

#[derive(Serialize)]
struct JsonRow<'a> {
    index: usize,
    #[serde(flatten)]
    fields: std::collections::BTreeMap<&'a str, String>,
}

fn print_table(session: &LedgerSession<CsvLedger>, format: OutputFormat) -> Result<()> {
    let table = session.table();
    let schema = table.schema();

    match format {
        OutputFormat::Json => {
            let rows: Vec<JsonRow<'_>> = table
                .rows()
                .iter()
                .enumerate()
                .map(|(index, row)| JsonRow {
                    index,
                    fields: schema
                        .fields()
                        .iter()
                        .zip(row.values())
                        .map(|(f, v)| (f.name.as_str(), v.to_display_string()))
                        .collect(),
                })
                .collect();
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &rows)?;
            use std::io::Write as _;
            writeln!(stdout)?;
        }
        OutputFormat::Text => {
            if table.is_empty() {
                println!("ledger is empty");
                return Ok(());
            }

            let mut widths: Vec<usize> =
                schema.fields().iter().map(|f| f.name.len()).collect();
            let rendered: Vec<Vec<String>> = table
                .rows()
                .iter()
                .map(|row| {
                    row.values()
                        .iter()
                        .enumerate()
                        .map(|(i, v)| {
                            let text = v.to_display_string();
                            widths[i] = widths[i].max(text.len());
                            text
                        })
                        .collect()
                })
                .collect();

            let index_width = rendered.len().saturating_sub(1).to_string().len().max(1);
            print!("{:>index_width$} ", "#");
            for (field, &width) in schema.fields().iter().zip(&widths) {
                print!(" {:width$}", field.name);
            }
            println!();
            for (index, row) in rendered.iter().enumerate() {
                print!("{index:>index_width$} ");
                for (text, &width) in row.iter().zip(&widths) {
                    print!(" {text:width$}");
                }
                println!();
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn field_pairs_parse_and_reject_garbage() {
        assert_eq!(
            parse_field_pair("invoice_no=INV1").unwrap(),
            ("invoice_no".to_string(), "INV1".to_string())
        );
        assert_eq!(
            parse_field_pair("color=").unwrap(),
            ("color".to_string(), String::new())
        );
        assert!(parse_field_pair("no-equals-sign").is_err());
        assert!(parse_field_pair("=value").is_err());
    }

    #[test]
    fn candidate_composes_the_note_field() {
        let schema = Schema::daily_sales();
        let candidate = build_candidate(
            &schema,
            &[("invoice_no".into(), "INV1".into())],
            Some("returned"),
            Some("wrong size"),
            None,
        )
        .unwrap();
        let remark = candidate
            .iter()
            .find(|(name, _)| name == "remark")
            .map(|(_, v)| v.to_display_string());
        assert_eq!(remark.as_deref(), Some("returned: wrong size"));
    }

    #[test]
    fn candidate_rejects_unknown_fields_and_bad_choices() {
        let schema = Schema::daily_sales();
        assert!(build_candidate(&schema, &[("bogus".into(), "x".into())], None, None, None).is_err());
        assert!(
            build_candidate(&schema, &[("seller".into(), "etsy".into())], None, None, None).is_err()
        );
        assert!(
            build_candidate(&schema, &[("seller".into(), "shopee".into())], None, None, None)
                .is_ok()
        );
        assert!(build_candidate(&schema, &[], Some("bogus"), None, None).is_err());
    }
}
