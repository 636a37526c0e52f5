use std::fs;
use std::path::PathBuf;

use p1d_core::{LabelError, P1dMeasurement};
use p1d_label::{check_measurement, InMemoryP1d, JsonDirP1d, P1dSource};

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures").join("p1d")
}

fn measurement(scale: f64) -> P1dMeasurement {
    P1dMeasurement {
        k_mpc: vec![0.1, 0.2, 0.4],
        p1d_mpc: vec![0.3 * scale, 0.2 * scale, 0.1 * scale],
    }
}

#[test]
fn in_memory_source_serves_by_snapshot() {
    let source: InMemoryP1d = (0..3).map(|idx| (idx, measurement(idx as f64 + 1.0))).collect();
    assert_eq!(source.len(), 3);
    let p1d = source.measure_p1d(2, 4.0).expect("measurement");
    assert_eq!(p1d, measurement(3.0));

    match source.measure_p1d(5, 2.0) {
        Err(LabelError::Measurement(info)) => {
            assert_eq!(info.code, "missing-measurement");
            assert_eq!(info.context.get("snapshot"), Some(&"5".to_string()));
        }
        other => panic!("expected measurement error, got {other:?}"),
    }
}

#[test]
fn json_directory_reads_numbered_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let expected = measurement(2.0);
    fs::write(
        dir.path().join("p1d_007.json"),
        serde_json::to_vec(&expected).expect("encode"),
    )
    .expect("write");

    let source = JsonDirP1d::new(dir.path());
    assert_eq!(source.path_for(7), dir.path().join("p1d_007.json"));
    assert_eq!(source.measure_p1d(7, 3.0).expect("read"), expected);

    let err = source.measure_p1d(8, 3.0).unwrap_err();
    assert!(matches!(err, LabelError::Measurement(ref info) if info.code == "missing-measurement"));

    fs::write(dir.path().join("p1d_009.json"), b"{\"k_Mpc\": [0.1]}").expect("write");
    assert!(matches!(source.measure_p1d(9, 3.0), Err(LabelError::Serde(_))));
}

#[test]
fn fixtures_are_aligned() {
    let source = JsonDirP1d::new(fixture_dir());
    for snapshot in 0..3 {
        let p1d = source.measure_p1d(snapshot, 2.0 + snapshot as f64).expect("fixture");
        check_measurement(snapshot, &p1d).expect("aligned");
        assert_eq!(p1d.k_mpc.len(), 8);
    }
}

#[test]
fn misaligned_measurement_is_rejected() {
    let p1d = P1dMeasurement {
        k_mpc: vec![0.1, 0.2],
        p1d_mpc: vec![0.3],
    };
    match check_measurement(4, &p1d) {
        Err(LabelError::Alignment(info)) => assert_eq!(info.code, "length-mismatch"),
        other => panic!("expected alignment error, got {other:?}"),
    }
}

#[test]
fn non_physical_samples_are_rejected() {
    for (k, p) in [(0.2, -0.1), (0.2, f64::NAN), (-0.2, 0.1), (f64::INFINITY, 0.1)] {
        let p1d = P1dMeasurement {
            k_mpc: vec![0.1, k],
            p1d_mpc: vec![0.3, p],
        };
        match check_measurement(1, &p1d) {
            Err(LabelError::Measurement(info)) => {
                assert_eq!(info.code, "invalid-sample");
                assert_eq!(info.context.get("index"), Some(&"1".to_string()));
            }
            other => panic!("expected measurement error, got {other:?}"),
        }
    }

    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("p1d_000.json"),
        b"{\"k_Mpc\": [0.1, 0.2], \"p1d_Mpc\": [0.3, -1.0]}",
    )
    .expect("write");
    let p1d = JsonDirP1d::new(dir.path()).measure_p1d(0, 2.0).expect("read");
    assert!(matches!(check_measurement(0, &p1d), Err(LabelError::Measurement(_))));
}
