//! Run log contents for a clean load. Own binary: the global logger is set once.

mod common;

use skuload_products::run;

use common::{config, feed, gzip, quiet, scripted_server};

#[test]
fn clean_load_logs_one_success_line_per_batch() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("products.db");
    let log_path = dir.path().join("logs").join("skuload.log");
    skuload_core::init_logging(true, false, None, Some(&log_path)).unwrap();

    let (url, _) = scripted_server(vec![(200, gzip(&feed()))]);
    let report = run(&config(url, &db), &quiet()).unwrap();
    assert!(report.all_batches_stored());
    log::logger().flush();

    let content = std::fs::read_to_string(&log_path).unwrap();
    let cleaned: Vec<&str> = content
        .lines()
        .filter(|l| l.contains(" - INFO - batch ") && l.contains(": cleaned "))
        .collect();
    assert_eq!(cleaned.len(), 2, "{content}");
    assert!(cleaned.iter().any(|l| l.contains("batch 0: cleaned 97 of 100 rows")));
    assert!(cleaned.iter().any(|l| l.contains("batch 1: cleaned 50 of 50 rows")));
    assert!(!content.contains(" - ERROR - "), "{content}");
    assert!(content.contains("Verification: 147 rows in table"));
}
