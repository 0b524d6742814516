//! Fixture forms and helpers

use chrono::{TimeZone, Utc};
use formflow_core::rules::{
    all_of, digits_only, max_length, one_of, pattern, positive_number, required, when,
};
use formflow_core::{FormDefinition, FormState, SubmissionReceipt, ValidationRuleSet};

/// Phone number used across OTP tests
pub const TEST_PHONE: &str = "+251911223344";

/// Stop payment order: three steps, OTP required.
///
/// `amount` is required and positive only when `mode` is `spo`; a `rspo`
/// (revoke) order carries no amount. Switching `mode` discards a sent OTP.
pub fn stop_payment_form() -> (FormDefinition, ValidationRuleSet<FormState>) {
    let definition = FormDefinition::new(
        "stop-payment",
        "Stop Payment Order",
        vec![
            ("Account", vec!["accountNumber", "mode"]),
            ("Cheque", vec!["chequeNumber", "amount", "reason"]),
            ("Confirm", vec!["otpCode"]),
        ],
    )
    .with_otp()
    .with_otp_reset_fields(["mode"]);

    let otp_code = match pattern(r"\d{4,6}", "Enter the code we sent you") {
        Ok(rule) => rule,
        Err(e) => panic!("fixture pattern is invalid: {}", e),
    };

    let rules = ValidationRuleSet::new()
        .rule(
            "accountNumber",
            all_of(vec![
                required("Account number is required"),
                digits_only("Account number must contain digits only"),
            ]),
        )
        .rule(
            "mode",
            all_of(vec![
                required("Select stop or revoke"),
                one_of(["spo", "rspo"], "Select stop or revoke"),
            ]),
        )
        .rule(
            "chequeNumber",
            all_of(vec![
                required("Cheque number is required"),
                digits_only("Cheque number must contain digits only"),
            ]),
        )
        .rule(
            "amount",
            when(
                "mode",
                "spo",
                all_of(vec![
                    required("Amount is required"),
                    positive_number("Amount must be greater than zero"),
                ]),
            ),
        )
        .rule("reason", max_length(200, "Reason is too long"))
        .rule(
            "otpCode",
            all_of(vec![required("Enter the code we sent you"), otp_code]),
        );

    (definition, rules)
}

/// A complete, valid stop payment order
pub fn stop_payment_data() -> FormState {
    FormState::new()
        .with("accountNumber", "1000123456")
        .with("mode", "spo")
        .with("chequeNumber", "000451")
        .with("amount", 2500.0)
        .with("otpCode", "123456")
}

/// Three steps; only `x` on step 0 is required
pub fn three_step_form() -> (FormDefinition, ValidationRuleSet<FormState>) {
    let definition = FormDefinition::new(
        "three-step",
        "Three Step Form",
        vec![("First", vec!["x"]), ("Second", vec!["y"]), ("Third", vec!["z"])],
    );
    let rules = ValidationRuleSet::new().rule("x", required("x is required"));
    (definition, rules)
}

/// A receipt as the backend would return it
pub fn receipt(reference: &str) -> SubmissionReceipt {
    SubmissionReceipt {
        id: format!("id-{}", reference),
        form_reference_id: reference.to_string(),
        status: "Pending".to_string(),
        submitted_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).single().unwrap_or_else(Utc::now),
        extra: serde_json::Map::new(),
    }
}
