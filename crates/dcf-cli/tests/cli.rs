use assert_cmd::Command;
use predicates::str::contains;

fn cmd() -> Command {
    Command::cargo_bin("dcf").unwrap()
}

const ACME_FLAGS: [&str; 13] = [
    "valuate",
    "--ticker",
    "ACME",
    "--shares-out",
    "1000",
    "--fcf-base",
    "100",
    "--discount-rate",
    "0.10",
    "--terminal-growth",
    "0.02",
    "--net-debt",
    "200",
];

#[test]
fn version() {
    cmd().arg("version").assert().success().stdout(contains("dcf "));
}

#[test]
fn valuate_from_flags_json() {
    cmd()
        .args(ACME_FLAGS)
        .write_stdin("")
        .assert()
        .success()
        .stdout(contains("\"per_share\": \"1.3709"))
        .stdout(contains("\"assumptions_echo\""));
}

#[test]
fn valuate_minimal_prints_per_share() {
    cmd()
        .args(["--output", "minimal"])
        .args(ACME_FLAGS)
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicates::str::starts_with("1.3709"));
}

#[test]
fn valuate_from_input_file_table() {
    cmd()
        .args(["--output", "table", "valuate", "--input", "tests/fixtures/acme.json"])
        .assert()
        .success()
        .stdout(contains("present_value"))
        .stdout(contains("Projection:"))
        .stdout(contains("140.25517307"));
}

#[test]
fn valuate_from_stdin_csv() {
    cmd()
        .args(["--output", "csv", "valuate"])
        .write_stdin(
            r#"{"ticker": "PAD", "shares_out": 1, "fcf_base": 100,
                "fcf_growth": [0.1, 0.2], "years": 4,
                "discount_rate": 0.10, "terminal_growth": 0.03}"#,
        )
        .assert()
        .success()
        .stdout(contains("field,value"))
        .stdout(contains("projections.3.fcf,190.08"))
        .stdout(contains("projections.3.growth_rate,0.2"));
}

#[test]
fn rate_below_terminal_growth_is_client_error() {
    cmd()
        .args([
            "valuate",
            "--shares-out",
            "1000",
            "--fcf-base",
            "100",
            "--discount-rate",
            "0.05",
            "--terminal-growth",
            "0.06",
        ])
        .write_stdin("")
        .assert()
        .code(2)
        .stdout(contains("\"kind\": \"invalid_assumptions\""))
        .stdout(contains("Discount rate must exceed terminal growth"))
        .stderr(contains("error"));
}

#[test]
fn missing_required_flag_is_client_error() {
    cmd()
        .args(["valuate", "--fcf-base", "100"])
        .write_stdin("")
        .assert()
        .code(2)
        .stdout(contains("--shares-out is required"));
}

#[test]
fn malformed_stdin_is_client_error() {
    cmd()
        .arg("valuate")
        .write_stdin("{not json")
        .assert()
        .code(2)
        .stdout(contains("serialization_error"));
}

#[test]
fn missing_input_file_is_not_client_error() {
    cmd()
        .args(["valuate", "--input", "tests/fixtures/does-not-exist.json"])
        .assert()
        .code(1)
        .stderr(contains("File not found"));
}

#[test]
fn wacc_from_flags_minimal() {
    cmd()
        .args([
            "--output",
            "minimal",
            "wacc",
            "--risk-free-rate",
            "0.042",
            "--erp",
            "0.055",
            "--beta",
            "1.10",
            "--cost-of-debt",
            "0.055",
            "--tax-rate",
            "0.21",
            "--debt-weight",
            "0.30",
            "--equity-weight",
            "0.70",
        ])
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicates::str::starts_with("0.084785"));
}

#[test]
fn wacc_from_stdin_json() {
    cmd()
        .arg("wacc")
        .write_stdin(
            r#"{"risk_free_rate": 0.042, "equity_risk_premium": 0.055,
                "cost_of_debt": 0.055, "tax_rate": 0.21,
                "debt_weight": 0.30, "equity_weight": 0.70}"#,
        )
        .assert()
        .success()
        .stdout(contains("\"cost_of_equity\": \"0.097"))
        .stdout(contains("WACC via CAPM build-up"));
}

#[test]
fn wacc_weights_off_is_client_error() {
    cmd()
        .arg("wacc")
        .write_stdin(
            r#"{"risk_free_rate": 0.042, "equity_risk_premium": 0.055,
                "cost_of_debt": 0.055, "tax_rate": 0.21,
                "debt_weight": 0.50, "equity_weight": 0.60}"#,
        )
        .assert()
        .code(2)
        .stdout(contains("\"kind\": \"invalid_input\""));
}
