use chrono::NaiveDate;

use crate::communications::domain::MergeContext;
use crate::communications::merge::{render, resolve, vocabulary, MergeField};

fn full_context() -> MergeContext {
    MergeContext {
        candidate_name: Some("Ada Lovelace".to_string()),
        candidate_email: Some("ada@example.com".to_string()),
        job_title: Some("Engineer".to_string()),
        company_name: Some("Acme".to_string()),
        status: Some("Offer".to_string()),
        application_date: NaiveDate::from_ymd_opt(2025, 3, 4),
    }
}

fn every_token() -> String {
    MergeField::ordered()
        .iter()
        .map(|field| format!("[{}]", field.token()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn fallback_values_fill_missing_fields() {
    let ctx = MergeContext {
        job_title: Some("Engineer".to_string()),
        company_name: Some("Acme".to_string()),
        ..MergeContext::default()
    };

    let resolved = resolve(
        "Hi {{candidate_name}}, re {{job_title}} at {{company_name}}",
        &ctx,
    );

    assert_eq!(resolved, "Hi Candidate, re Engineer at Acme");
}

#[test]
fn resolved_output_never_contains_registered_tokens() {
    let template = every_token();

    for ctx in [MergeContext::default(), full_context()] {
        let resolved = resolve(&template, &ctx);
        for field in MergeField::ordered() {
            assert!(
                !resolved.contains(field.token()),
                "{} survived resolution: {resolved}",
                field.token()
            );
        }
    }
}

#[test]
fn every_occurrence_is_replaced() {
    let ctx = full_context();
    let resolved = resolve("{{candidate_name}} / {{candidate_name}}", &ctx);
    assert_eq!(resolved, "Ada Lovelace / Ada Lovelace");
}

#[test]
fn unknown_tokens_pass_through() {
    let resolved = resolve(
        "Dear {{candidate_name}}, {{unknown_field}} stays",
        &full_context(),
    );
    assert_eq!(resolved, "Dear Ada Lovelace, {{unknown_field}} stays");
}

#[test]
fn empty_strings_use_fallbacks() {
    let ctx = MergeContext {
        candidate_name: Some(String::new()),
        job_title: Some(String::new()),
        company_name: Some(String::new()),
        status: Some(String::new()),
        ..MergeContext::default()
    };

    let resolved = resolve(
        "{{candidate_name}}|{{job_title}}|{{company_name}}|{{status}}|{{candidate_email}}|{{application_date}}",
        &ctx,
    );

    assert_eq!(resolved, "Candidate|the position|Our Company|||");
}

#[test]
fn application_date_uses_long_form() {
    let resolved = resolve("Applied {{application_date}}", &full_context());
    assert_eq!(resolved, "Applied March 4, 2025");
}

#[test]
fn registry_order_is_applied_to_values_containing_tokens() {
    // candidate_name runs before job_title, so the injected token is itself replaced.
    let ctx = MergeContext {
        candidate_name: Some("{{job_title}}".to_string()),
        job_title: Some("Engineer".to_string()),
        ..MergeContext::default()
    };
    assert_eq!(resolve("{{candidate_name}}", &ctx), "Engineer");

    // company_name runs after candidate_name, so this one is left as text.
    let ctx = MergeContext {
        company_name: Some("{{candidate_name}}".to_string()),
        ..MergeContext::default()
    };
    assert_eq!(resolve("{{company_name}}", &ctx), "{{candidate_name}}");
}

#[test]
fn resolution_is_repeatable() {
    let ctx = full_context();
    let text = "Hello {{candidate_name}} ({{status}})";
    let first = resolve(text, &ctx);
    let second = resolve(text, &ctx);
    assert_eq!(first, second);
    assert_eq!(ctx, full_context());
}

#[test]
fn render_resolves_subject_and_body() {
    let rendered = render(
        "Update on {{job_title}}",
        "Hi {{candidate_name}}, status: {{status}}",
        &full_context(),
    );
    assert_eq!(rendered.subject, "Update on Engineer");
    assert_eq!(rendered.body, "Hi Ada Lovelace, status: Offer");
}

#[test]
fn vocabulary_lists_fields_in_registry_order() {
    let tokens: Vec<&str> = vocabulary().iter().map(|entry| entry.token).collect();
    assert_eq!(
        tokens,
        vec![
            "{{candidate_name}}",
            "{{candidate_email}}",
            "{{job_title}}",
            "{{company_name}}",
            "{{status}}",
            "{{application_date}}",
        ]
    );
}
