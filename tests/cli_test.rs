//! End-to-end tests driving the REPL binary over stdin/stdout

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::tempdir;

fn run(path: &Path, commands: &[String], envs: &[(&str, &str)]) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_rowstore"))
        .arg(path)
        .envs(envs.iter().copied())
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    {
        let mut stdin = child.stdin.take().unwrap();
        // The binary may exit before reading everything.
        for command in commands {
            if writeln!(stdin, "{command}").is_err() {
                break;
            }
        }
    }

    child.wait_with_output().unwrap()
}

fn run_script(path: &Path, commands: &[String]) -> Vec<String> {
    let output = run(path, commands, &[]);
    assert!(output.status.success(), "{output:?}");
    String::from_utf8(output.stdout)
        .unwrap()
        .split('\n')
        .map(str::to_string)
        .collect()
}

fn script(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|l| l.to_string()).collect()
}

#[test]
fn test_inserts_and_retrieves_a_row() {
    let dir = tempdir().unwrap();
    let result = run_script(
        &dir.path().join("test.db"),
        &script(&["insert 1 user1 person1@example.com", "select", ".exit"]),
    );

    assert_eq!(
        result,
        vec![
            "db > Executed.",
            "db > (1, user1, person1@example.com)",
            "Executed.",
            "db > ",
        ]
    );
}

#[test]
fn test_keeps_data_after_closing_connection() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");

    let result = run_script(
        &path,
        &script(&["insert 1 user1 person1@example.com", ".exit"]),
    );
    assert_eq!(result, vec!["db > Executed.", "db > "]);

    let result = run_script(&path, &script(&["select", ".exit"]));
    assert_eq!(
        result,
        vec!["db > (1, user1, person1@example.com)", "Executed.", "db > "]
    );
}

#[test]
fn test_end_of_input_closes_table() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");

    run_script(&path, &script(&["insert 5 five five@example.com"]));

    let result = run_script(&path, &script(&["select", ".exit"]));
    assert_eq!(result[0], "db > (5, five, five@example.com)");
}

#[test]
fn test_allows_max_length_strings() {
    let dir = tempdir().unwrap();
    let username = "a".repeat(32);
    let email = "a".repeat(255);
    let result = run_script(
        &dir.path().join("test.db"),
        &[
            format!("insert 1 {username} {email}"),
            "select".to_string(),
            ".exit".to_string(),
        ],
    );

    assert_eq!(
        result,
        vec![
            "db > Executed.".to_string(),
            format!("db > (1, {username}, {email})"),
            "Executed.".to_string(),
            "db > ".to_string(),
        ]
    );
}

#[test]
fn test_rejects_long_strings_and_negative_ids() {
    let dir = tempdir().unwrap();
    let result = run_script(
        &dir.path().join("test.db"),
        &[
            format!("insert 1 {} foo@bar.com", "a".repeat(33)),
            "insert -1 cstack foo@bar.com".to_string(),
            "select".to_string(),
            ".exit".to_string(),
        ],
    );

    assert_eq!(
        result,
        vec![
            "db > String is too long.",
            "db > ID must be positive.",
            "db > Executed.",
            "db > ",
        ]
    );
}

#[test]
fn test_duplicate_id_error() {
    let dir = tempdir().unwrap();
    let result = run_script(
        &dir.path().join("test.db"),
        &script(&[
            "insert 1 user1 person1@example.com",
            "insert 1 user1 person1@example.com",
            "select",
            ".exit",
        ]),
    );

    assert_eq!(
        result,
        vec![
            "db > Executed.",
            "db > Error: Duplicate key.",
            "db > (1, user1, person1@example.com)",
            "Executed.",
            "db > ",
        ]
    );
}

#[test]
fn test_unrecognized_input() {
    let dir = tempdir().unwrap();
    let result = run_script(
        &dir.path().join("test.db"),
        &script(&[".tables", "update 1", "insert 1", ".exit"]),
    );

    assert_eq!(
        result,
        vec![
            "db > Unrecognized command '.tables'",
            "db > Unrecognized keyword at start of 'update 1'.",
            "db > Syntax error. Could not parse statement.",
            "db > ",
        ]
    );
}

#[test]
fn test_prints_constants() {
    let dir = tempdir().unwrap();
    let result = run_script(&dir.path().join("test.db"), &script(&[".constants", ".exit"]));

    assert_eq!(
        result,
        vec![
            "db > Constants:",
            "ROW_SIZE: 293",
            "COMMON_NODE_HEADER_SIZE: 6",
            "LEAF_NODE_HEADER_SIZE: 10",
            "LEAF_NODE_CELL_SIZE: 297",
            "LEAF_NODE_SPACE_FOR_CELLS: 4086",
            "LEAF_NODE_MAX_CELLS: 13",
            "db > ",
        ]
    );
}

#[test]
fn test_prints_structure_of_one_node_btree() {
    let dir = tempdir().unwrap();
    let result = run_script(
        &dir.path().join("test.db"),
        &script(&[
            "insert 3 user3 person3@example.com",
            "insert 1 user1 person1@example.com",
            "insert 2 user2 person2@example.com",
            ".btree",
            ".exit",
        ]),
    );

    assert_eq!(
        result,
        vec![
            "db > Executed.",
            "db > Executed.",
            "db > Executed.",
            "db > Tree:",
            "- leaf (size 3)",
            " - 1",
            " - 2",
            " - 3",
            "db > ",
        ]
    );
}

#[test]
fn test_prints_structure_of_three_leaf_btree() {
    let dir = tempdir().unwrap();
    let mut commands: Vec<String> = (1..=14)
        .map(|i| format!("insert {i} user{i} person{i}@example.com"))
        .collect();
    commands.push(".btree".to_string());
    commands.push("insert 15 user15 person15@example.com".to_string());
    commands.push(".exit".to_string());

    let result = run_script(&dir.path().join("test.db"), &commands);

    let mut expected = vec!["db > Tree:".to_string(), "- internal (size 1)".to_string()];
    expected.push(" - leaf (size 7)".to_string());
    expected.extend((1..=7).map(|i| format!("  - {i}")));
    expected.push(" - key 7".to_string());
    expected.push(" - leaf (size 7)".to_string());
    expected.extend((8..=14).map(|i| format!("  - {i}")));
    expected.push("db > Executed.".to_string());
    expected.push("db > ".to_string());

    assert_eq!(result[14..], expected[..]);
}

#[test]
fn test_prints_all_rows_in_multi_level_tree() {
    let dir = tempdir().unwrap();
    let mut commands: Vec<String> = (1..=15)
        .map(|i| format!("insert {i} user{i} person{i}@example.com"))
        .collect();
    commands.push("select".to_string());
    commands.push(".exit".to_string());

    let result = run_script(&dir.path().join("test.db"), &commands);

    let mut expected = vec!["db > (1, user1, person1@example.com)".to_string()];
    expected.extend((2..=15).map(|i| format!("({i}, user{i}, person{i}@example.com)")));
    expected.push("Executed.".to_string());
    expected.push("db > ".to_string());

    assert_eq!(result[15..], expected[..]);
}

#[test]
fn test_table_full_message() {
    let dir = tempdir().unwrap();
    let commands: Vec<String> = (1..=14)
        .map(|i| format!("insert {i} user{i} person{i}@example.com"))
        .chain(std::iter::once(".exit".to_string()))
        .collect();

    let output = run(
        &dir.path().join("test.db"),
        &commands,
        &[("ROWSTORE_MAX_PAGES", "1")],
    );
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.split('\n').collect();
    assert_eq!(lines[12], "db > Executed.");
    assert_eq!(lines[13], "db > Error: Table full.");
}

#[test]
fn test_missing_filename() {
    let output = Command::new(env!("CARGO_BIN_EXE_rowstore"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "Must supply a database filename.\n"
    );
}

#[test]
fn test_corrupt_file_exits_with_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");
    std::fs::write(&path, b"not a page").unwrap();

    let output = run(&path, &script(&[".exit"]), &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8(output.stdout).unwrap().is_empty());
}
