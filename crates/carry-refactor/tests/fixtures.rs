use std::path::{Path, PathBuf};

use carry_refactor::{move_method, FieldVisibility, MoveMethodParams};
use carry_test_utils::{apply, assert_fixture_transformed};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

#[test]
fn move_total_into_invoice() {
    let dir = fixture("move_total");
    assert_fixture_transformed(&dir.join("before"), &dir.join("after"), |files| {
        let params = MoveMethodParams {
            source_type: "Order".to_string(),
            method: "total".to_string(),
            target_type: "Invoice".to_string(),
            field_visibility: FieldVisibility::PrivateFinal,
        };
        let outcome = move_method(files, params).unwrap();
        apply(files, &outcome.edit)
    });
}
