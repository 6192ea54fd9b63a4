//! Integration test: the earnings ledger is the sole source of truth.
//!
//! Corrupts the derived wallet row by hand, then verifies a recompute
//! restores it exactly from the ledger - and that recompute is a pure
//! function of the ledger state (idempotent under repetition).

use mentora_db::queries::refs;
use mentora_ledger::{impressions, wallet};
use mentora_ledger::impressions::NewImpression;
use mentora_types::impression::{AdPlatform, ClientMeta};
use mentora_types::MICROS_PER_CREDIT;

const BASE_TIME: u64 = 1_700_000_000;

#[test]
fn wallet_reconstructable_by_replay() {
    mentora_integration_tests::init_tracing();
    let mut conn = mentora_db::open_memory().expect("open DB");
    let instructor = refs::insert_user(&conn, "ada", "instructor", BASE_TIME).expect("user");
    let student = refs::insert_user(&conn, "bob", "student", BASE_TIME).expect("user");
    let course = refs::insert_course(&conn, "Rust 101", instructor, BASE_TIME).expect("course");

    for i in 0..5u64 {
        impressions::record_impression(
            &mut conn,
            &NewImpression {
                user_id: student,
                course_id: course,
                lecture_id: None,
                platform: AdPlatform::Adsense,
                cpm_micros: 2_000_000,
                estimated_revenue_micros: Some(2 * MICROS_PER_CREDIT),
                view_secs: 60,
                client: ClientMeta {
                    ip_address: None,
                    user_agent: Some("Mozilla/5.0".to_string()),
                },
            },
            BASE_TIME + i,
        )
        .expect("record");
    }

    let before = wallet::get(&conn, student).expect("wallet");
    assert_eq!(before.available_micros, 5 * 2 * MICROS_PER_CREDIT * 90 / 100);

    // Vandalize the derived row directly.
    conn.execute(
        "UPDATE user_wallets SET available_micros = 1, pending_micros = 2,
             withdrawn_micros = 3, total_micros = 4
         WHERE user_id = ?1",
        [student],
    )
    .expect("corrupt");

    // One replay restores the snapshot exactly.
    let restored = wallet::recompute_now(&mut conn, student, BASE_TIME + 100).expect("recompute");
    assert_eq!(restored.available_micros, before.available_micros);
    assert_eq!(restored.pending_micros, before.pending_micros);
    assert_eq!(restored.withdrawn_micros, before.withdrawn_micros);
    assert_eq!(restored.total_micros, before.total_micros);

    // Replaying again changes nothing.
    let again = wallet::recompute_now(&mut conn, student, BASE_TIME + 100).expect("recompute");
    assert_eq!(again, restored);
}
