use csv_bulk_loader::destination::{BulkOptions, Destination, SqlDialect};
use csv_bulk_loader::ingestion::{load_from_reader, LoadOptions};
use csv_bulk_loader::types::{TableName, Value};
use csv_bulk_loader::{LoadError, LoadStage};

#[derive(Debug, thiserror::Error)]
#[error("injected failure at {0}")]
struct Injected(&'static str);

/// Records every call and fails at one named step.
#[derive(Default)]
struct ScriptedDestination {
    fail_at: Vec<&'static str>,
    catalog: Vec<String>,
    calls: Vec<&'static str>,
    executed: Vec<String>,
    bound: Vec<String>,
    bulk: Option<BulkOptions>,
    rows: Vec<Vec<Value>>,
}

impl ScriptedDestination {
    fn failing_at(step: &'static str) -> Self {
        Self::failing_at_each(&[step])
    }

    fn failing_at_each(steps: &[&'static str]) -> Self {
        Self {
            fail_at: steps.to_vec(),
            ..Default::default()
        }
    }

    fn step(&mut self, name: &'static str) -> Result<(), Injected> {
        self.calls.push(name);
        if self.fail_at.contains(&name) {
            Err(Injected(name))
        } else {
            Ok(())
        }
    }
}

impl Destination for ScriptedDestination {
    type Error = Injected;

    fn dialect(&self) -> SqlDialect {
        SqlDialect::SqlServer
    }

    fn begin(&mut self) -> Result<(), Injected> {
        self.step("begin")
    }

    fn execute(&mut self, sql: &str) -> Result<(), Injected> {
        self.step("execute")?;
        self.executed.push(sql.to_string());
        Ok(())
    }

    fn table_columns(&mut self, _table: &TableName) -> Result<Vec<String>, Injected> {
        self.step("table_columns")?;
        Ok(self.catalog.clone())
    }

    fn open_bulk(
        &mut self,
        _table: &TableName,
        columns: &[String],
        options: BulkOptions,
    ) -> Result<(), Injected> {
        self.step("open_bulk")?;
        self.bound = columns.to_vec();
        self.bulk = Some(options);
        Ok(())
    }

    fn send_row(&mut self, row: &[Value]) -> Result<(), Injected> {
        self.step("send_row")?;
        self.rows.push(row.to_vec());
        Ok(())
    }

    fn finish_bulk(&mut self) -> Result<u64, Injected> {
        self.step("finish_bulk")?;
        Ok(self.rows.len() as u64)
    }

    fn commit(&mut self) -> Result<(), Injected> {
        self.step("commit")
    }

    fn rollback(&mut self) -> Result<(), Injected> {
        self.step("rollback")
    }
}

const PEOPLE: &str = "id,name,amount\n1,Alice,\"10,5\"\n2,Bob,\"20,0\"\n";

fn create_options() -> LoadOptions {
    LoadOptions {
        create_table: true,
        overwrite: true,
        ..LoadOptions::new("dbo.people".parse().unwrap(), "isf".parse().unwrap())
    }
}

fn run(dest: &mut ScriptedDestination, options: &LoadOptions) -> Result<u64, LoadError> {
    load_from_reader(PEOPLE.as_bytes(), "people", dest, options).map(|s| s.rows)
}

fn stage_of(err: &LoadError) -> Option<LoadStage> {
    match err {
        LoadError::Destination { stage, .. } => Some(*stage),
        _ => None,
    }
}

#[test]
fn successful_load_follows_the_stage_order() {
    let mut dest = ScriptedDestination::default();
    assert_eq!(run(&mut dest, &create_options()).unwrap(), 2);

    assert_eq!(
        dest.calls,
        vec![
            "begin",
            "execute",
            "execute",
            "open_bulk",
            "send_row",
            "send_row",
            "finish_bulk",
            "commit"
        ]
    );
    assert!(dest.executed[0].starts_with("IF OBJECT_ID"));
    assert!(dest.executed[1].ends_with("WITH (DATA_COMPRESSION = PAGE)"));
    assert_eq!(dest.bound, vec!["id", "name", "amount"]);
    assert_eq!(dest.bulk, Some(BulkOptions { table_lock: true }));
    assert_eq!(
        dest.rows,
        vec![
            vec![Value::Int64(1), Value::Utf8("Alice".into()), Value::Float64(10.5)],
            vec![Value::Int64(2), Value::Utf8("Bob".into()), Value::Float64(20.0)],
        ]
    );
}

#[test]
fn failures_after_begin_roll_back() {
    for (step, stage) in [
        ("execute", LoadStage::Provision),
        ("open_bulk", LoadStage::Prepare),
        ("send_row", LoadStage::Stream),
        ("finish_bulk", LoadStage::Finalize),
    ] {
        let mut dest = ScriptedDestination::failing_at(step);
        let err = run(&mut dest, &create_options()).unwrap_err();

        assert_eq!(stage_of(&err), Some(stage), "{step}");
        assert_eq!(dest.calls.last(), Some(&"rollback"), "{step}");
        assert!(!dest.calls.contains(&"commit"), "{step}");
    }
}

#[test]
fn failed_rollback_keeps_the_original_error() {
    let mut dest = ScriptedDestination::failing_at_each(&["send_row", "rollback"]);
    let err = run(&mut dest, &create_options()).unwrap_err();

    assert_eq!(stage_of(&err), Some(LoadStage::Stream));
    assert_eq!(err.to_string(), "execute statement: injected failure at send_row");
    assert_eq!(dest.calls.last(), Some(&"rollback"));
    assert!(!dest.calls.contains(&"commit"));
}

#[test]
fn failed_begin_is_not_rolled_back() {
    let mut dest = ScriptedDestination::failing_at("begin");
    let err = run(&mut dest, &create_options()).unwrap_err();
    assert_eq!(stage_of(&err), Some(LoadStage::Begin));
    assert_eq!(dest.calls, vec!["begin"]);
}

#[test]
fn failed_commit_is_reported_without_rollback() {
    let mut dest = ScriptedDestination::failing_at("commit");
    let err = run(&mut dest, &create_options()).unwrap_err();
    assert_eq!(stage_of(&err), Some(LoadStage::Commit));
    assert_eq!(dest.calls.last(), Some(&"commit"));
    assert!(!dest.calls.contains(&"rollback"));
    assert_eq!(err.to_string(), "commit: injected failure at commit");
}

#[test]
fn parse_failure_stops_streaming_and_rolls_back() {
    let input = "id,name,amount\n1,Alice,1\nx,Bob,2\n3,Cy,3\n";
    let mut dest = ScriptedDestination::default();
    let err = load_from_reader(input.as_bytes(), "bad", &mut dest, &create_options()).unwrap_err();

    assert!(matches!(err, LoadError::ParseError { row: 3, ref column, .. } if column == "id"));
    assert_eq!(dest.rows.len(), 1);
    assert_eq!(dest.calls.last(), Some(&"rollback"));
    assert!(!dest.calls.contains(&"finish_bulk"));
}

#[test]
fn unknown_column_names_are_resolved_inside_the_transaction() {
    let mut dest = ScriptedDestination {
        catalog: vec!["a".into(), "b".into(), "c".into()],
        ..Default::default()
    };
    let options = LoadOptions {
        resolve_columns_from_table: true,
        ..LoadOptions::new("dbo.people".parse().unwrap(), "isf".parse().unwrap())
    };
    run(&mut dest, &options).unwrap();

    assert_eq!(&dest.calls[..3], ["begin", "table_columns", "open_bulk"]);
    assert_eq!(dest.bound, vec!["a", "b", "c"]);
}

#[test]
fn catalog_failure_is_wrapped_and_rolled_back() {
    let mut dest = ScriptedDestination::failing_at("table_columns");
    let options = LoadOptions {
        resolve_columns_from_table: true,
        ..LoadOptions::new("dbo.people".parse().unwrap(), "isf".parse().unwrap())
    };
    let err = run(&mut dest, &options).unwrap_err();
    assert_eq!(stage_of(&err), Some(LoadStage::ResolveColumns));
    assert!(err.to_string().starts_with("get column names from database:"));
    assert_eq!(dest.calls.last(), Some(&"rollback"));
}

#[test]
fn configuration_errors_never_open_a_transaction() {
    let mut dest = ScriptedDestination::default();
    let options = LoadOptions {
        create_table: true,
        ..LoadOptions::new("dbo.people".parse().unwrap(), "imf".parse().unwrap())
    };
    let err = run(&mut dest, &options).unwrap_err();
    assert!(matches!(err, LoadError::UnsupportedColumnType { .. }));
    assert!(dest.calls.is_empty());
}
