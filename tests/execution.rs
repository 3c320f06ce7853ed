use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use polyglot_runner::{CodeExecutor, Config, ExecutionRequest, FailureKind};

fn toolchain_available(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

macro_rules! require_toolchain {
    ($program:expr) => {
        if !toolchain_available($program) {
            eprintln!("skipping: {} is not installed", $program);
            return;
        }
    };
}

fn executor_in(root: &Path, max_execution_time: Duration) -> CodeExecutor {
    CodeExecutor::native(&Config {
        max_execution_time,
        workspace_dir: root.to_path_buf(),
        ..Config::default()
    })
}

fn assert_no_leftovers(root: &Path) {
    let leftovers: Vec<_> = std::fs::read_dir(root)
        .map(|dir| dir.flatten().map(|entry| entry.path()).collect())
        .unwrap_or_default();
    assert!(leftovers.is_empty(), "workspace leaked: {:?}", leftovers);
}

#[tokio::test]
async fn test_unsupported_language() {
    let root = tempfile::tempdir().unwrap();
    let workspace_root = root.path().join("runs");
    let executor = executor_in(&workspace_root, Duration::from_secs(5));

    let outcome = executor
        .execute(&ExecutionRequest::new("puts 'hi'", "ruby"))
        .await;

    assert!(!outcome.success);
    assert_eq!(
        outcome.error.as_deref(),
        Some("Language 'ruby' is not supported")
    );
    assert_eq!(outcome.execution_time, 0.0);
    assert!(!workspace_root.exists());
}

#[tokio::test]
async fn test_python_hello() {
    require_toolchain!("python3");
    let root = tempfile::tempdir().unwrap();
    let executor = executor_in(root.path(), Duration::from_secs(10));

    let outcome = executor
        .execute(&ExecutionRequest::new("print(1+1)", "python"))
        .await;

    assert!(outcome.success, "{:?}", outcome);
    assert_eq!(outcome.output.as_deref(), Some("2\n"));
    assert_eq!(outcome.error, None);
    assert!(outcome.execution_time > 0.0);
    assert_no_leftovers(root.path());
}

#[tokio::test]
async fn test_python_with_input() {
    require_toolchain!("python3");
    let root = tempfile::tempdir().unwrap();
    let executor = executor_in(root.path(), Duration::from_secs(10));

    let request = ExecutionRequest::new("n = int(input())\nprint(n * 2)", "python").with_input("5");
    let outcome = executor.execute(&request).await;

    assert!(outcome.success, "{:?}", outcome);
    assert_eq!(outcome.output.as_deref(), Some("10\n"));
    assert_no_leftovers(root.path());
}

#[tokio::test]
async fn test_python_runtime_error_keeps_partial_output() {
    require_toolchain!("python3");
    let root = tempfile::tempdir().unwrap();
    let executor = executor_in(root.path(), Duration::from_secs(10));

    let outcome = executor
        .execute(&ExecutionRequest::new(
            "print('before', flush=True)\nx = 1 / 0",
            "python",
        ))
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.output.as_deref(), Some("before\n"));
    assert!(outcome.error.unwrap().contains("ZeroDivisionError"));
    assert_eq!(outcome.failure, Some(FailureKind::RuntimeFailure));
    assert_no_leftovers(root.path());
}

#[tokio::test]
async fn test_python_files_written_by_program_are_removed() {
    require_toolchain!("python3");
    let root = tempfile::tempdir().unwrap();
    let executor = executor_in(root.path(), Duration::from_secs(10));

    let outcome = executor
        .execute(&ExecutionRequest::new(
            "open('scratch.txt', 'w').write('x')\nprint('ok')",
            "python",
        ))
        .await;

    assert!(outcome.success, "{:?}", outcome);
    assert_no_leftovers(root.path());
}

#[tokio::test]
async fn test_python_timeout() {
    require_toolchain!("python3");
    let root = tempfile::tempdir().unwrap();
    let executor = executor_in(root.path(), Duration::from_secs(2));

    let started = Instant::now();
    let outcome = executor
        .execute(&ExecutionRequest::new("while True: pass", "python"))
        .await;

    assert!(started.elapsed() < Duration::from_secs(6));
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("timed out"));
    assert_eq!(outcome.execution_time, 2.0);
    assert_eq!(outcome.failure, Some(FailureKind::Timeout));
    assert_no_leftovers(root.path());
}

#[tokio::test]
async fn test_javascript_hello() {
    require_toolchain!("node");
    let root = tempfile::tempdir().unwrap();
    let executor = executor_in(root.path(), Duration::from_secs(10));

    let code = "const arr = [1, 2, 3, 4, 5];\nconsole.log(arr.reduce((a, b) => a + b, 0));";
    let outcome = executor
        .execute(&ExecutionRequest::new(code, "javascript"))
        .await;

    assert!(outcome.success, "{:?}", outcome);
    assert_eq!(outcome.output.as_deref(), Some("15\n"));
    assert_no_leftovers(root.path());
}

#[tokio::test]
async fn test_cpp_mathematical_program() {
    require_toolchain!("g++");
    let root = tempfile::tempdir().unwrap();
    let executor = executor_in(root.path(), Duration::from_secs(30));

    let source_code = r#"
#include <iostream>
using namespace std;

int main() {
    int a, b;
    cin >> a >> b;
    cout << "Sum: " << (a + b) << endl;
    cout << "Product: " << (a * b) << endl;
    return 0;
}
"#;

    let outcome = executor
        .execute(&ExecutionRequest::new(source_code, "cpp").with_input("15 25"))
        .await;

    assert!(outcome.success, "{:?}", outcome);
    assert_eq!(outcome.output.as_deref(), Some("Sum: 40\nProduct: 375\n"));
    assert_no_leftovers(root.path());
}

#[tokio::test]
async fn test_cpp_compilation_error() {
    require_toolchain!("g++");
    let root = tempfile::tempdir().unwrap();
    let executor = executor_in(root.path(), Duration::from_secs(30));

    let invalid_source = r#"
#include <iostream>
using namespace std;

int main() {
    cout << "Missing semicolon here"
    return 0;
}
"#;

    let outcome = executor
        .execute(&ExecutionRequest::new(invalid_source, "cpp"))
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.output, None);
    assert_eq!(outcome.failure, Some(FailureKind::CompileFailure));
    assert!(outcome.error.unwrap().contains("solution.cpp"));
    assert_no_leftovers(root.path());
}

#[tokio::test]
async fn test_c_runtime_exit_code() {
    require_toolchain!("gcc");
    let root = tempfile::tempdir().unwrap();
    let executor = executor_in(root.path(), Duration::from_secs(30));

    let source = "#include <stdio.h>\nint main(void) { printf(\"partial\\n\"); return 3; }\n";
    let outcome = executor.execute(&ExecutionRequest::new(source, "c")).await;

    assert!(!outcome.success);
    assert_eq!(outcome.output.as_deref(), Some("partial\n"));
    assert_eq!(outcome.error.as_deref(), Some("Execution failed"));
    assert_no_leftovers(root.path());
}

#[tokio::test]
async fn test_cpp_timeout_kills_compiled_artifact() {
    require_toolchain!("g++");
    let root = tempfile::tempdir().unwrap();
    let executor = executor_in(root.path(), Duration::from_secs(10));

    let source_code = r#"
#include <iostream>
#include <thread>
#include <chrono>
using namespace std;

int main() {
    cout << "Starting sleep..." << endl;
    this_thread::sleep_for(chrono::seconds(60));
    cout << "Sleep finished!" << endl;
    return 0;
}
"#;

    let outcome = executor
        .execute(&ExecutionRequest::new(source_code, "cpp"))
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.failure, Some(FailureKind::Timeout));
    assert_eq!(outcome.execution_time, 10.0);
    assert_no_leftovers(root.path());
}

#[tokio::test]
async fn test_java_hello() {
    require_toolchain!("javac");
    let root = tempfile::tempdir().unwrap();
    let executor = executor_in(root.path(), Duration::from_secs(30));

    let source = r#"
public class Main {
    public static void main(String[] args) {
        System.out.println("Hello, Java!");
    }
}
"#;
    let outcome = executor.execute(&ExecutionRequest::new(source, "java")).await;

    assert!(outcome.success, "{:?}", outcome);
    assert_eq!(outcome.output.as_deref(), Some("Hello, Java!\n"));
    assert_no_leftovers(root.path());
}

#[tokio::test]
async fn test_java_any_public_class_name() {
    require_toolchain!("javac");
    let root = tempfile::tempdir().unwrap();
    let executor = executor_in(root.path(), Duration::from_secs(30));

    let source = r#"
import java.util.Scanner;

public class Solution {
    public static void main(String[] args) {
        Scanner in = new Scanner(System.in);
        System.out.println("hi " + in.nextLine());
    }
}
"#;
    let outcome = executor
        .execute(&ExecutionRequest::new(source, "java").with_input("there\n"))
        .await;

    assert!(outcome.success, "{:?}", outcome);
    assert_eq!(outcome.output.as_deref(), Some("hi there\n"));
    assert_no_leftovers(root.path());
}

#[tokio::test]
async fn test_missing_toolchain_is_launch_failure() {
    let root = tempfile::tempdir().unwrap();
    let mut config = Config {
        workspace_dir: root.path().to_path_buf(),
        ..Config::default()
    };
    config.toolchains.python = "/aboba/python".into();
    let executor = CodeExecutor::native(&config);

    let outcome = executor
        .execute(&ExecutionRequest::new("print(1)", "python"))
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.failure, Some(FailureKind::LaunchFailure));
    assert_eq!(outcome.execution_time, 0.0);
    assert!(outcome.error.unwrap().contains("/aboba/python"));
    assert_no_leftovers(root.path());
}
