use crate::infra::{
    demo_roster, InMemoryActivityRepository, InMemoryRecipientRepository,
    InMemoryTemplateRepository, LoggingMailer, DEMO_TENANT,
};
use chrono::NaiveDate;
use clap::Args;
use hireloop::communications::{
    resolve, CommunicationService, DispatchConfig, DispatchRequest, EntityId, MergeContext,
    NewTemplate, RosterImporter, TemplateTrigger, TenantId,
};
use hireloop::error::AppError;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Optional roster CSV to dispatch against instead of the built-in candidates.
    #[arg(long)]
    pub(crate) roster_csv: Option<PathBuf>,
    /// Tenant whose recipients receive the batch.
    #[arg(long, default_value = DEMO_TENANT)]
    pub(crate) tenant: String,
    /// Addresses the simulated relay refuses. Repeatable.
    #[arg(long = "fail")]
    pub(crate) failing: Vec<String>,
    /// Parallel deliveries (1 sends sequentially).
    #[arg(long, default_value_t = DispatchConfig::default().max_concurrency)]
    pub(crate) concurrency: usize,
}

#[derive(Args, Debug)]
pub(crate) struct PreviewArgs {
    /// Text containing `{{merge_field}}` tokens.
    pub(crate) text: String,
    #[arg(long)]
    pub(crate) candidate_name: Option<String>,
    #[arg(long)]
    pub(crate) candidate_email: Option<String>,
    #[arg(long)]
    pub(crate) job_title: Option<String>,
    #[arg(long)]
    pub(crate) company_name: Option<String>,
    #[arg(long)]
    pub(crate) status: Option<String>,
    /// Application date (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) application_date: Option<NaiveDate>,
}

pub(crate) fn run_preview(args: PreviewArgs) -> Result<(), AppError> {
    let PreviewArgs {
        text,
        candidate_name,
        candidate_email,
        job_title,
        company_name,
        status,
        application_date,
    } = args;

    let context = MergeContext {
        candidate_name,
        candidate_email,
        job_title,
        company_name,
        status,
        application_date,
    };
    println!("{}", resolve(&text, &context));
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        roster_csv,
        tenant,
        failing,
        concurrency,
    } = args;

    let (roster, source) = match roster_csv {
        Some(path) => (RosterImporter::from_path(path)?, "roster CSV"),
        None => (demo_roster(), "built-in roster"),
    };
    let tenant = TenantId(tenant);
    let sample = roster
        .iter()
        .find(|recipient| recipient.tenant_id == tenant)
        .cloned();
    let recipients = InMemoryRecipientRepository::seeded(roster);
    let recipient_ids = recipients.ids_for(&tenant);
    let mailer = LoggingMailer::failing(failing);

    println!("Candidate communication demo");
    println!(
        "Tenant {} | {} recipients from {} | concurrency {}",
        tenant.0,
        recipient_ids.len(),
        source,
        concurrency.max(1)
    );

    let service = CommunicationService::new(
        Arc::new(InMemoryTemplateRepository::default()),
        Arc::new(recipients),
        Arc::new(InMemoryActivityRepository::default()),
        Arc::new(mailer.clone()),
        DispatchConfig {
            max_concurrency: concurrency,
            ..DispatchConfig::default()
        },
    );

    let template = service.create_template(
        &tenant,
        NewTemplate {
            name: "Application update".to_string(),
            subject: "Your {{job_title}} application at {{company_name}}".to_string(),
            body: "Hi {{candidate_name}},\n\nThanks for applying on {{application_date}}. \
                   Your application is now in the {{status}} stage.\n\n{{company_name}} Recruiting"
                .to_string(),
            trigger: Some(TemplateTrigger::StatusChanged),
        },
    )?;
    println!("\nTemplate {} ({})", template.id.0, template.name);
    if let Some(sample) = sample {
        let rendered =
            service.preview_template(&tenant, &template.id, &sample.merge_context())?;
        println!("Preview for {}:", sample.id.0);
        println!("  Subject: {}", rendered.subject);
        for line in rendered.body.lines() {
            println!("  | {line}");
        }
    }

    let result = service
        .dispatch(
            &tenant,
            DispatchRequest {
                recipient_ids: recipient_ids.clone(),
                subject: template.subject.clone(),
                body: template.body.clone(),
                template_id: Some(template.id.clone()),
            },
        )
        .await?;

    println!(
        "\nDispatch: {}/{} delivered, {} failed",
        result.sent,
        result.total,
        result.failed()
    );
    for outcome in &result.outcomes {
        let status = if outcome.delivered { "sent" } else { "failed" };
        match &outcome.failure {
            Some(reason) => println!("- {} {} ({})", outcome.recipient_id.0, status, reason),
            None => println!("- {} {}", outcome.recipient_id.0, status),
        }
        if !outcome.audited {
            println!("  activity entry missing for {}", outcome.recipient_id.0);
        }
    }

    println!("\nActivity trail");
    for id in &recipient_ids {
        for record in service.activity_for(&tenant, &EntityId::from(id))? {
            println!(
                "- {} {} {} | {} | delivered={}",
                record.occurred_at.format("%Y-%m-%d %H:%M:%S"),
                record.kind.label(),
                record.entity_id.0,
                record.payload.subject,
                record.payload.delivered
            );
        }
    }

    println!("\nRelay outbox: {} message(s)", mailer.outbox().len());
    Ok(())
}
