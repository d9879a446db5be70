use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};

struct Tree {
    _tmp: TempDir,
    home: PathBuf,
    working: PathBuf,
    inbox: PathBuf,
    destination: PathBuf,
    ledgers: PathBuf,
}

fn tree() -> Tree {
    let tmp = tempdir().expect("tempdir");
    let home = tmp.path().to_path_buf();
    let working = home.join("working");
    let inbox = working.join("Upload_ooc");
    let destination = home.join("destination");
    let ledgers = home.join("ledgers");
    fs::create_dir_all(&inbox).expect("mkdir inbox");
    fs::create_dir_all(&destination).expect("mkdir destination");
    Tree {
        _tmp: tmp,
        home,
        working,
        inbox,
        destination,
        ledgers,
    }
}

fn tiersync(tree: &Tree) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("tiersync");
    cmd.current_dir(&tree.home)
        .env("TIERSYNC_HOME", &tree.home)
        .env("TIERSYNC_WORKING_ROOT", &tree.working)
        .env("TIERSYNC_INBOX_DIR", &tree.inbox)
        .env("TIERSYNC_DESTINATION_ROOT", &tree.destination)
        .env("TIERSYNC_LEDGER_DIR", &tree.ledgers)
        .env("TIERSYNC_STATE_DIR", tree.home.join("state"))
        .env("TIERSYNC_CONFIG_PATH", tree.home.join("absent.toml"))
        .env("TIERSYNC_LOG_PLAIN", "1")
        .env_remove("RUST_LOG");
    cmd
}

fn write_transaction(tree: &Tree, job: &str, original: &Path, moved: &Path) {
    let log = tree.ledgers.join("revert_log.csv");
    fs::create_dir_all(&tree.ledgers).expect("mkdir ledgers");
    let mut body = if log.exists() {
        fs::read_to_string(&log).expect("read log")
    } else {
        "Job No,Original Path,Moved Path,Timestamp\n".to_string()
    };
    body.push_str(&format!(
        "{job},{},{},2026-01-05 10:00:00\n",
        original.display(),
        moved.display()
    ));
    fs::write(&log, body).expect("write log");
}

#[test]
fn watch_once_files_inbox_document_into_job_folder() {
    let tree = tree();
    fs::create_dir_all(tree.working.join("IR00451")).expect("mkdir job");
    fs::write(tree.inbox.join("Invoice_IR_00451.pdf"), "pdf").expect("write");
    fs::write(tree.inbox.join("scan_0001.pdf"), "pdf").expect("write");

    tiersync(&tree)
        .args(["watch", "--once", "--only", "ingest"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ingest MOVED Invoice_IR_00451.pdf"));

    assert!(tree.working.join("IR00451/Invoice_IR_00451.pdf").exists());
    assert!(tree.inbox.join("scan_0001.pdf").exists());
    let log = fs::read_to_string(tree.ledgers.join("ooc_upload_log.csv")).expect("ingest log");
    assert!(log.starts_with("Timestamp,Filename,Job No,Destination Path,Status"));
    assert!(log.contains("SKIPPED: no pattern"));
}

#[test]
fn watch_once_reconciles_stray_company_file() {
    let tree = tree();
    let bmw = tree.destination.join("BMW INDIA PVT LTD");
    fs::create_dir_all(bmw.join("IR00451 - BMW")).expect("mkdir job");
    fs::write(bmw.join("Packing_List_IR00451.docx"), "doc").expect("write");

    tiersync(&tree)
        .args(["watch", "--once", "--only", "reconcile", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"moved\": 1"));

    assert!(bmw.join("IR00451 - BMW/Packing_List_IR00451.docx").exists());
    assert!(tree.ledgers.join("loose_file_log.csv").exists());
}

#[test]
fn unreadable_trigger_document_is_skipped() {
    let tree = tree();
    let job = tree.working.join("IR00451");
    fs::create_dir_all(&job).expect("mkdir job");
    fs::write(job.join("Out_of_Charge_IR_00451.pdf"), "not a pdf").expect("write");

    tiersync(&tree)
        .args(["watch", "--once", "--only", "promote"])
        .assert()
        .success();

    assert!(job.exists());
    let log = fs::read_to_string(tree.ledgers.join("job_move_log.csv")).expect("promotion log");
    assert!(log.contains("Could not extract text from PDF"));
    assert!(!tree.ledgers.join("revert_log.csv").exists());
}

#[test]
fn watch_once_reports_missing_root() {
    let tree = tree();
    fs::remove_dir_all(&tree.destination).expect("remove destination");

    tiersync(&tree)
        .args(["watch", "--once", "--only", "reconcile"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E003_ROOT_MISSING"));
}

#[test]
fn revert_moves_folder_back_and_records_history() {
    let tree = tree();
    let original = tree.working.join("IR00451");
    let moved = tree.destination.join("BMW INDIA PVT LTD/IR00451");
    fs::create_dir_all(&moved).expect("mkdir moved");
    fs::write(moved.join("Invoice.pdf"), "x").expect("write");
    write_transaction(&tree, "IR00451", &original, &moved);

    tiersync(&tree)
        .args(["--json", "revert", "IR_00451"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"result\": \"reverted\""));

    assert!(original.join("Invoice.pdf").exists());
    assert!(!moved.exists());
    let history = fs::read_to_string(tree.ledgers.join("revert_history_log.csv")).expect("history");
    assert!(history.contains("SUCCESS"));

    tiersync(&tree)
        .args(["history", "--filter", "reverted"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[reverted]"));

    tiersync(&tree)
        .args(["revert", "IR00451"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("folder no longer exists"));
}

#[test]
fn revert_of_unknown_job_fails_and_is_logged() {
    let tree = tree();
    write_transaction(&tree, "IR00451", &tree.working.join("IR00451"), &tree.destination.join("X/IR00451"));

    tiersync(&tree)
        .args(["revert", "IR99999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no transaction entry found for IR99999"));

    let history = fs::read_to_string(tree.ledgers.join("revert_history_log.csv")).expect("history");
    assert!(history.contains("FAILED: No transaction entry"));
}

#[test]
fn logs_search_and_forget_edit_transaction_log() {
    let tree = tree();
    write_transaction(&tree, "IR00451", &tree.working.join("IR00451"), &tree.destination.join("A/IR00451"));
    write_transaction(&tree, "IR00452", &tree.working.join("IR00452"), &tree.destination.join("A/IR00452"));

    tiersync(&tree)
        .args(["logs", "transactions", "--search", "ir00452"])
        .assert()
        .success()
        .stdout(predicate::str::contains("showing 1 of 2 row(s)"));

    tiersync(&tree)
        .args(["forget", "IR00451"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed 1 transaction row(s)"));

    let log = fs::read_to_string(tree.ledgers.join("revert_log.csv")).expect("log");
    assert!(log.starts_with("Job No,Original Path,Moved Path,Timestamp"));
    assert!(!log.contains("IR00451"));
    assert!(log.contains("IR00452"));
}

#[test]
fn report_summarises_promotion_ledger() {
    let tree = tree();
    fs::create_dir_all(&tree.ledgers).expect("mkdir ledgers");
    fs::write(
        tree.ledgers.join("job_move_log.csv"),
        "Timestamp,Job No,Importer,Billing Folder,Trigger File,Action,Comments\n\
         2026-01-05 10:00:00,IR00451,BMW INDIA PRIVATE LIMITED,BMW INDIA PVT LTD,t.pdf,MOVED,Moved to x\n\
         2026-01-05 10:00:01,IR00452,,,t.pdf,SKIPPED,No matching importer found in PDF\n\
         2026-01-05 10:00:02,IR00453,ACME,ACME,t.pdf,ERROR,Permission denied: nope\n",
    )
    .expect("write ledger");
    let out = tree.home.join("report.txt");

    tiersync(&tree)
        .args(["report", "--out"])
        .arg(&out)
        .assert()
        .success();

    let text = fs::read_to_string(&out).expect("report");
    assert!(text.contains("Moved:      1"));
    assert!(text.contains("Permission denied: nope"));
    assert!(text.contains("- No matching importer found in PDF"));
}

#[test]
fn stop_without_daemon_is_a_no_op() {
    let tree = tree();
    tiersync(&tree)
        .arg("stop")
        .assert()
        .success()
        .stdout(predicate::str::contains("already stopped"));
}

#[test]
fn status_before_first_ledger_write_is_healthy() {
    let tree = tree();
    assert!(!tree.ledgers.exists());

    tiersync(&tree)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("(not created yet)"));
}
