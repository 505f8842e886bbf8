use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn installments_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("installments"))
}

fn init_config(dir: &Path) {
    installments_cmd()
        .args(["-C", dir.to_str().unwrap(), "init"])
        .assert()
        .success();
}

fn run(dir: &Path, args: &[&str]) -> assert_cmd::assert::Assert {
    installments_cmd()
        .args(["-C", dir.to_str().unwrap()])
        .args(args)
        .assert()
}

/// Opens entry #1 for the template client: 100,00 over three installments
/// (ids 2, 3 and 4).
fn add_three_way_entry(dir: &Path) {
    run(
        dir,
        &[
            "add",
            "--client",
            "example-client",
            "--total",
            "100,00",
            "--installments",
            "3",
            "--date",
            "2026-01-31",
        ],
    )
    .success();
}

#[test]
fn test_help() {
    installments_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Installment plans"));
}

#[test]
fn test_version() {
    installments_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("installments"));
}

#[test]
fn test_init_creates_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("installments-config");

    installments_cmd()
        .args(["-C", config_path.to_str().unwrap(), "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized installments config"));

    assert!(config_path.join("config.toml").exists());
    assert!(config_path.join("clients.toml").exists());
    assert!(config_path.join("accounts.toml").exists());
}

#[test]
fn test_init_fails_if_exists() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("installments-config");

    init_config(&config_path);

    installments_cmd()
        .args(["-C", config_path.to_str().unwrap(), "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_commands_require_init() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("missing");

    run(&config_path, &["list"])
        .failure()
        .stderr(predicate::str::contains("installments init"));
}

#[test]
fn test_clients_and_accounts() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("installments-config");
    init_config(&config_path);

    run(&config_path, &["clients"])
        .success()
        .stdout(predicate::str::contains("example-client"))
        .stdout(predicate::str::contains("Example Client Ltda."));

    run(&config_path, &["accounts"])
        .success()
        .stdout(predicate::str::contains("caixa"))
        .stdout(predicate::str::contains("bank"));
}

#[test]
fn test_simulate_puts_the_remainder_on_the_last_installment() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("installments-config");
    init_config(&config_path);

    run(
        &config_path,
        &[
            "simulate",
            "--total",
            "100,00",
            "--installments",
            "3",
            "--date",
            "2026-01-31",
        ],
    )
    .success()
    .stdout(predicate::str::contains("R$ 33,33"))
    .stdout(predicate::str::contains("R$ 33,34"))
    .stdout(predicate::str::contains("28/02/2026"));

    // Nothing is written by a simulation
    assert!(!config_path.join("state.toml").exists());
}

#[test]
fn test_simulate_with_down_payment_over_total_is_not_ready() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("installments-config");
    init_config(&config_path);

    run(
        &config_path,
        &[
            "simulate",
            "--total",
            "100,00",
            "--down-payment",
            "150,00",
            "--installments",
            "3",
        ],
    )
    .success()
    .stdout(predicate::str::contains("Plan not ready"));
}

#[test]
fn test_simulate_refuses_oversized_counts() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("installments-config");
    init_config(&config_path);

    run(
        &config_path,
        &[
            "simulate",
            "--total",
            "100",
            "--installments",
            "4000000000",
            "--date",
            "2026-01-01",
        ],
    )
    .failure()
    .code(1)
    .stderr(predicate::str::contains("too large"));
}

#[test]
fn test_bad_date_format_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("installments-config");
    init_config(&config_path);

    let config_file = config_path.join("config.toml");
    let content = fs::read_to_string(&config_file).unwrap();
    fs::write(&config_file, content.replace("%d/%m/%Y", "%d/%Q")).unwrap();

    run(&config_path, &["status"])
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid date_format"));
}

#[test]
fn test_add_and_show_plan() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("installments-config");
    init_config(&config_path);

    add_three_way_entry(&config_path);

    let state = fs::read_to_string(config_path.join("state.toml")).unwrap();
    assert!(state.contains("[[entries]]"));
    assert!(state.contains("[[entries.installments]]"));

    run(&config_path, &["plan", "1"])
        .success()
        .stdout(predicate::str::contains("example-client"))
        .stdout(predicate::str::contains("R$ 33,34"))
        .stdout(predicate::str::contains("PENDING"))
        .stdout(predicate::str::contains("Outstanding: R$ 100,00"));
}

#[test]
fn test_add_with_unknown_client_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("installments-config");
    init_config(&config_path);

    run(
        &config_path,
        &["add", "--client", "nobody", "--total", "10,00"],
    )
    .failure()
    .stderr(predicate::str::contains("Client 'nobody' not found"));
}

#[test]
fn test_add_rejects_bad_date() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("installments-config");
    init_config(&config_path);

    run(
        &config_path,
        &[
            "add",
            "--client",
            "example-client",
            "--total",
            "10,00",
            "--date",
            "31/01/2026",
        ],
    )
    .failure()
    .stderr(predicate::str::contains("Invalid date"));
}

#[test]
fn test_pay_installment_and_refuse_overpayment() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("installments-config");
    init_config(&config_path);
    add_three_way_entry(&config_path);

    run(&config_path, &["pay", "2", "20,00", "--account", "caixa"])
        .success()
        .stdout(predicate::str::contains("R$ 13,33 remaining"));

    run(&config_path, &["pay", "2", "50,00", "--account", "caixa"])
        .failure()
        .stderr(predicate::str::contains("exceed"));

    run(&config_path, &["pay", "2", "13,33", "--account", "banco"])
        .success()
        .stdout(predicate::str::contains("fully paid"));

    run(&config_path, &["payments", "1"])
        .success()
        .stdout(predicate::str::contains("caixa"))
        .stdout(predicate::str::contains("banco"))
        .stdout(predicate::str::contains("Total paid: R$ 33,33 / R$ 100,00"));

    run(&config_path, &["accounts"])
        .success()
        .stdout(predicate::str::contains("R$ 20,00"));
}

#[test]
fn test_pay_requires_a_known_account() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("installments-config");
    init_config(&config_path);
    add_three_way_entry(&config_path);

    run(&config_path, &["pay", "2", "10,00"]).failure();

    run(&config_path, &["pay", "2", "10,00", "--account", "cofre"])
        .failure()
        .stderr(predicate::str::contains("cofre"));
}

#[test]
fn test_edit_and_remove_payment() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("installments-config");
    init_config(&config_path);
    add_three_way_entry(&config_path);

    run(&config_path, &["pay", "3", "10,00", "--account", "caixa"]).success();

    run(&config_path, &["edit-payment", "1", "40,00"])
        .failure()
        .stderr(predicate::str::contains("exceed"));

    run(&config_path, &["edit-payment", "1", "33,33"])
        .success()
        .stdout(predicate::str::contains("fully paid"));

    run(&config_path, &["remove-payment", "1"])
        .success()
        .stdout(predicate::str::contains("R$ 33,33 remaining"));

    run(&config_path, &["payments", "3"])
        .success()
        .stdout(predicate::str::contains("No payments recorded"));
}

#[test]
fn test_edit_installment_rebalances_last() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("installments-config");
    init_config(&config_path);
    add_three_way_entry(&config_path);

    run(&config_path, &["edit-installment", "1", "1", "40,00"])
        .success()
        .stdout(predicate::str::contains("Updated installment 1"))
        .stdout(predicate::str::contains("R$ 26,67"));

    run(&config_path, &["edit-installment", "1", "3", "20,00"])
        .success()
        .stderr(predicate::str::contains("must be R$ 26,67"));
}

#[test]
fn test_edit_installment_overflow_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("installments-config");
    init_config(&config_path);
    add_three_way_entry(&config_path);

    run(&config_path, &["edit-installment", "1", "1", "150,00"])
        .success()
        .stderr(predicate::str::contains("plan unchanged"));

    run(&config_path, &["plan", "1"])
        .success()
        .stdout(predicate::str::contains("R$ 33,34"));
}

#[test]
fn test_warnings_are_printed_once() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("installments-config");
    init_config(&config_path);
    add_three_way_entry(&config_path);

    installments_cmd()
        .env_remove("INSTALLMENTS_LOG")
        .args(["-C", config_path.to_str().unwrap()])
        .args(["edit-installment", "1", "1", "150,00"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Warning:"))
        .stderr(predicate::str::contains("WARN").not());
}

#[test]
fn test_edit_installment_below_paid_is_refused() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("installments-config");
    init_config(&config_path);
    add_three_way_entry(&config_path);

    run(&config_path, &["pay", "2", "33,33", "--account", "caixa"]).success();

    run(&config_path, &["edit-installment", "1", "1", "10,00"])
        .failure()
        .stderr(predicate::str::contains("cannot go below"));

    run(&config_path, &["plan", "1"])
        .success()
        .stdout(predicate::str::contains("R$ 33,34"))
        .stdout(predicate::str::contains("R$ 10,00").not());
}

#[test]
fn test_terms_change_regenerates_plan() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("installments-config");
    init_config(&config_path);
    add_three_way_entry(&config_path);

    run(
        &config_path,
        &["terms", "1", "--total", "120,00", "--installments", "4"],
    )
    .success()
    .stdout(predicate::str::contains("R$ 30,00"));

    run(&config_path, &["list"])
        .success()
        .stdout(predicate::str::contains("4x"));
}

#[test]
fn test_list_shows_financial_footer() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("installments-config");
    init_config(&config_path);
    add_three_way_entry(&config_path);

    run(
        &config_path,
        &[
            "add",
            "--client",
            "example-client",
            "--kind",
            "credit",
            "--total",
            "50,00",
        ],
    )
    .success()
    .stdout(predicate::str::contains("Single payment"));

    run(&config_path, &["pay", "2", "33,33", "--account", "caixa"]).success();

    run(&config_path, &["list"])
        .success()
        .stdout(predicate::str::contains("TOTAL"))
        .stdout(predicate::str::contains("R$ 150,00"))
        .stdout(predicate::str::contains("(-) PAID"))
        .stdout(predicate::str::contains("(=) OUTSTANDING"))
        .stdout(predicate::str::contains("R$ 116,67"))
        .stdout(predicate::str::contains("single"));
}

#[test]
fn test_export_prints_json() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("installments-config");
    init_config(&config_path);
    add_three_way_entry(&config_path);
    run(&config_path, &["pay", "4", "33,34", "--account", "banco"]).success();

    let output = installments_cmd()
        .args(["-C", config_path.to_str().unwrap(), "export", "1"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["entry"]["client"], "example-client");
    assert_eq!(json["entry"]["installments"].as_array().unwrap().len(), 3);
    assert_eq!(json["payments"][0]["parent_entry_id"], 4);
    assert_eq!(json["payments"][0]["amount"], "33.34");
}
