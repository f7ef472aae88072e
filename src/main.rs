use clap::{Parser, Subcommand};
use serde_json::Value;
use std::io::{self, Read};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use varpath::{
    deep_assign, deep_assign_path, form, ActionError, LeafOp, PathError, UpdateVariable,
    UpdateVariableSettings, VariableStore,
};

/// Apply path operations to a JSON document read from stdin.
#[derive(Parser)]
#[command(name = "varpath", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the value at PATH (`null` if absent).
    Get { path: String },
    /// Store the JSON VALUE at PATH.
    Set {
        path: String,
        value: String,
        /// Fail on a shape conflict instead of overwriting it.
        #[arg(long)]
        strict: bool,
    },
    /// Remove the value at PATH.
    Delete { path: String },
    /// Append a null placeholder to the array at PATH.
    Push { path: String },
    /// Deep-merge the JSON VALUE into the document, or assign it at a dotted
    /// path with --at.
    Merge {
        value: String,
        #[arg(long)]
        at: Option<String>,
    },
    /// Treat stdin as a variable store and run an update-variable payload.
    Update { settings: String },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut input = String::new();
    if let Err(err) = io::stdin().read_to_string(&mut input) {
        eprintln!("ERROR READING STDIN: {}", err);
        return ExitCode::FAILURE;
    }

    match run(cli.command, &input) {
        Ok(Some(output)) => {
            println!("{}", pretty(&output));
            ExitCode::SUCCESS
        }
        Ok(None) => {
            println!("undefined");
            ExitCode::SUCCESS
        }
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, input: &str) -> Result<Option<Value>, ActionError> {
    let document = parse_document(input)?;
    match command {
        Command::Get { path } => Ok(form::get_value(&document, &path)?
            .cloned()
            .or(Some(Value::Null))),
        Command::Set {
            path,
            value,
            strict,
        } => {
            let value: Value = serde_json::from_str(&value)?;
            if strict {
                let mut document = document;
                form::set_value(&mut document, &path, value)?;
                Ok(Some(document))
            } else {
                Ok(LeafOp::Set(value).apply(Some(document), &path)?)
            }
        }
        Command::Delete { path } => Ok(LeafOp::Delete.apply(Some(document), &path)?),
        Command::Push { path } => Ok(LeafOp::PushUndefined.apply(Some(document), &path)?),
        Command::Merge { value, at } => {
            let value: Value = serde_json::from_str(&value)?;
            let mut document = document;
            match at {
                Some(path) => deep_assign_path(&mut document, &path, value)?,
                None => {
                    deep_assign(&mut document, &[&value])?;
                }
            }
            Ok(Some(document))
        }
        Command::Update { settings } => {
            let settings = UpdateVariableSettings::from_json(&settings)?;
            let store: VariableStore = serde_json::from_value(document)?;
            let store = store.shared();
            UpdateVariable::new(store.clone()).run(&settings, &Value::Null)?;
            let snapshot = serde_json::to_value(&*store.borrow())?;
            Ok(Some(snapshot))
        }
    }
}

/// Empty stdin is an empty object.
fn parse_document(input: &str) -> Result<Value, ActionError> {
    if input.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    Ok(serde_json::from_str(input)?)
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn report(err: &ActionError) {
    eprintln!("{}", format_error(err));
}

fn format_error(err: &ActionError) -> String {
    match err {
        ActionError::Path(PathError::Parse {
            path,
            message,
            offset,
        }) => {
            let mut underline = String::new();
            for _ in 0..*offset {
                underline.push(' ');
            }
            underline.push('^');

            format!("ERROR IN PATH:\n{}\n{}\n{}", path, underline, message)
        }
        other => format!("ERROR: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run_ok(command: Command, input: &str) -> Option<Value> {
        run(command, input).unwrap()
    }

    #[test]
    fn get_reads_missing_as_null() {
        let input = r#"{ "a": { "b": [1, 2] } }"#;
        let get = |path: &str| Command::Get { path: path.to_string() };
        assert_eq!(run_ok(get("a.b[1]"), input), Some(json!(2)));
        assert_eq!(run_ok(get("a.c"), input), Some(Value::Null));
    }

    #[test]
    fn set_lenient_and_strict() {
        let input = r#"{ "a": 5 }"#;
        let set = |strict| Command::Set {
            path: "a.b".to_string(),
            value: "true".to_string(),
            strict,
        };
        assert_eq!(run_ok(set(false), input), Some(json!({ "a": { "b": true } })));
        let err = run(set(true), input).unwrap_err();
        assert_eq!(err.code(), "path-type-mismatch");
    }

    #[test]
    fn delete_push_and_merge() {
        let input = r#"{ "list": [1, 2] }"#;
        assert_eq!(
            run_ok(Command::Delete { path: "list.0".to_string() }, input),
            Some(json!({ "list": [2] }))
        );
        assert_eq!(
            run_ok(Command::Push { path: "list".to_string() }, input),
            Some(json!({ "list": [1, 2, null] }))
        );
        assert_eq!(run_ok(Command::Delete { path: "".to_string() }, input), None);
        let merge = Command::Merge {
            value: r#"{ "k": 1 }"#.to_string(),
            at: Some("x.y".to_string()),
        };
        assert_eq!(run_ok(merge, ""), Some(json!({ "x": { "y": { "k": 1 } } })));
    }

    #[test]
    fn update_runs_against_stdin_store() {
        let update = Command::Update {
            settings: r#"{ "dataElementId": "v", "data": { "b": 2 }, "transforms": { "a": { "clear": true } } }"#
                .to_string(),
        };
        assert_eq!(
            run_ok(update, r#"{ "v": { "a": 1, "c": 3 } }"#),
            Some(json!({ "v": { "c": 3, "b": 2 } }))
        );
    }

    #[test]
    fn parse_error_underlines_offset() {
        let err = run(Command::Get { path: "a[x]".to_string() }, "{}").unwrap_err();
        let report = format_error(&err);
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "ERROR IN PATH:");
        assert_eq!(lines[1], "a[x]");
        assert_eq!(lines[2], "  ^");
        assert!(lines[3].starts_with("Expected"));
    }

    #[test]
    fn other_errors_are_one_line() {
        let set = Command::Set {
            path: "a".to_string(),
            value: "{not json".to_string(),
            strict: false,
        };
        let err = run(set, "{}").unwrap_err();
        assert!(format_error(&err).starts_with("ERROR: "));
        assert_eq!(err.code(), "invalid-settings");
    }
}
