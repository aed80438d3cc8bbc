use std::fs;
use std::path::Path;

use ndarray::array;
use tempfile::tempdir;

use super::*;

fn write_csv(path: &Path, header: &str, rows: &[&str]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut content = format!("{}\n", header);
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    fs::write(path, content).unwrap();
}

fn make_device(root: &Path, device: &str, with_mirai: bool) {
    let dir = root.join(device);
    write_csv(&dir.join(BENIGN_FILE), "a,b", &["1,10", "2,20", "3,30", "4,40", "5,50", "6,60"]);
    write_csv(&dir.join(GAFGYT_DIR).join("udp.csv"), "a,b", &["7,70", "8,80", "9,90"]);
    write_csv(&dir.join(GAFGYT_DIR).join("combo.csv"), "a,b", &["100,1000"]);
    if with_mirai {
        write_csv(&dir.join(MIRAI_DIR).join("syn.csv"), "a,b", &["11,110", "12,120"]);
    }
}

#[test]
fn test_holdout_start_rounding() {
    assert_eq!(holdout_start(9, 2.0 / 3.0), 6);
    assert_eq!(holdout_start(10, 2.0 / 3.0), 7);
    assert_eq!(holdout_start(1, 2.0 / 3.0), 1);
    assert_eq!(holdout_start(0, 2.0 / 3.0), 0);
    assert_eq!(holdout_start(5, 0.0), 0);
    assert_eq!(holdout_start(5, 2.0), 5);
}

#[test]
fn test_batch_holdout_start_cuts_on_batches() {
    // 10 batches of 64 -> holdout from batch 7
    assert_eq!(batch_holdout_start(640, 64, 2.0 / 3.0), 448);
    // 2 batches, the second one short
    assert_eq!(batch_holdout_start(100, 64, 2.0 / 3.0), 64);
    // a single batch rounds past the end
    assert_eq!(batch_holdout_start(5, 64, 2.0 / 3.0), 5);
    assert_eq!(batch_holdout_start(0, 64, 2.0 / 3.0), 0);
    assert_eq!(batch_holdout_start(9, 1, 2.0 / 3.0), holdout_start(9, 2.0 / 3.0));
}

#[test]
fn test_holdout_tail() {
    let data = array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0]];
    let tail = holdout(data.view(), 2.0 / 3.0);
    assert_eq!(tail, array![[4.0], [5.0]]);
}

#[test]
fn test_attack_files_order() {
    let dir = tempdir().unwrap();
    make_device(dir.path(), "Danmini_Doorbell", true);

    let files = attack_files(&dir.path().join("Danmini_Doorbell")).unwrap();
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();

    // gafgyt first (sorted), then mirai
    assert_eq!(names, vec!["combo.csv", "udp.csv", "syn.csv"]);
}

#[test]
fn test_attack_files_ignore_non_csv() {
    let dir = tempdir().unwrap();
    make_device(dir.path(), "Ennio_Doorbell", false);
    fs::write(dir.path().join("Ennio_Doorbell").join(GAFGYT_DIR).join("README.txt"), "x").unwrap();

    let files = attack_files(&dir.path().join("Ennio_Doorbell")).unwrap();
    assert_eq!(files.len(), 2);
}

#[test]
fn test_missing_gafgyt_is_error() {
    let dir = tempdir().unwrap();
    let device = dir.path().join("Broken");
    write_csv(&device.join(BENIGN_FILE), "a", &["1", "2"]);

    assert!(matches!(attack_files(&device), Err(DatasetError::MissingFile(_))));
}

#[test]
fn test_load_device_without_mirai() {
    let dir = tempdir().unwrap();
    make_device(dir.path(), "Samsung_SNH_1011_N_Webcam", false);

    let options = DatasetOptions::default();
    let data = load_device(dir.path(), "Samsung_SNH_1011_N_Webcam", &options).unwrap();

    assert_eq!(data.name, "Samsung_SNH_1011_N_Webcam");
    assert_eq!(data.benign.dim(), (6, 2));
    assert_eq!(data.attack.dim(), (4, 2));
    assert!(data.benign.iter().all(|v| v.is_finite()));
}

#[test]
fn test_attack_rows_per_file_limit() {
    let dir = tempdir().unwrap();
    make_device(dir.path(), "Danmini_Doorbell", true);

    let options = DatasetOptions {
        attack_rows_per_file: 1,
        ..Default::default()
    };
    let data = load_device(dir.path(), "Danmini_Doorbell", &options).unwrap();

    // one row from each of the three attack files
    assert_eq!(data.attack.nrows(), 3);
}

#[test]
fn test_benign_normalized_against_itself() {
    let dir = tempdir().unwrap();
    make_device(dir.path(), "Danmini_Doorbell", false);

    let data = load_device(dir.path(), "Danmini_Doorbell", &DatasetOptions::default()).unwrap();
    let column_mean = data.benign.column(0).sum() / data.benign.nrows() as f64;
    assert!(column_mean.abs() < 1e-12);
}

#[test]
fn test_load_devices_width_mismatch() {
    let dir = tempdir().unwrap();
    make_device(dir.path(), "A", false);

    let b = dir.path().join("B");
    write_csv(&b.join(BENIGN_FILE), "a,b,c", &["1,2,3", "4,5,6"]);
    write_csv(&b.join(GAFGYT_DIR).join("x.csv"), "a,b,c", &["1,2,3"]);

    let devices = vec!["A".to_string(), "B".to_string()];
    let result = load_devices(dir.path(), &devices, &DatasetOptions::default());
    assert!(matches!(
        result,
        Err(DatasetError::WidthMismatch { expected: 2, actual: 3, .. })
    ));
}

#[test]
fn test_attack_width_mismatch() {
    let dir = tempdir().unwrap();
    make_device(dir.path(), "A", false);
    write_csv(
        &dir.path().join("A").join(GAFGYT_DIR).join("wide.csv"),
        "a,b,c",
        &["1,2,3"],
    );

    let result = load_device(dir.path(), "A", &DatasetOptions::default());
    assert!(matches!(result, Err(DatasetError::WidthMismatch { .. })));
}

#[test]
fn test_missing_device_dir() {
    let dir = tempdir().unwrap();
    let result = load_device(dir.path(), "Nowhere", &DatasetOptions::default());
    assert!(matches!(result, Err(DatasetError::MissingFile(_))));
}

#[test]
fn test_empty_benign_rejected() {
    let dir = tempdir().unwrap();
    let device = dir.path().join("Empty");
    write_csv(&device.join(BENIGN_FILE), "a,b", &[]);
    write_csv(&device.join(GAFGYT_DIR).join("x.csv"), "a,b", &["1,2"]);

    let result = load_device(dir.path(), "Empty", &DatasetOptions::default());
    assert!(matches!(result, Err(DatasetError::Empty(_))));
}
