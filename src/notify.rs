//! Outbound email notification
//!
//! Plain-text SMTP mail for two flows: the automatic high-risk alert to the
//! safety manager, and manual assessment shares. Recipient allow-listing is
//! enforced by the caller before a send is attempted.

use crate::config::SmtpConfig;
use crate::error::{Result, SafetyAiError};
use crate::pipeline::SiteAssessment;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

const SEND_ATTEMPTS: u32 = 3;

pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl Mailer {
    pub fn from_config(smtp: &SmtpConfig) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
            .map_err(|e| SafetyAiError::Email(format!("SMTP relay setup failed: {e}")))?
            .port(smtp.port);

        if let (Some(user), Some(pass)) = (&smtp.username, &smtp.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: smtp.from.clone(),
        })
    }

    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let email = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| SafetyAiError::Email(format!("invalid sender address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| SafetyAiError::Email(format!("invalid recipient address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| SafetyAiError::Email(format!("message build failed: {e}")))?;

        let mut last_err = None;
        for attempt in 0..SEND_ATTEMPTS {
            match self.transport.send(email.clone()).await {
                Ok(_) => return Ok(()),
                Err(e) => {
                    tracing::warn!(attempt = attempt + 1, recipient = %to, error = %e, "email send failed, retrying");
                    last_err = Some(e);
                    if attempt + 1 < SEND_ATTEMPTS {
                        tokio::time::sleep(Duration::from_millis(100 * 2u64.pow(attempt))).await;
                    }
                }
            }
        }

        Err(SafetyAiError::Email(format!(
            "send to {} failed after {} attempts: {}",
            to,
            SEND_ATTEMPTS,
            last_err.map(|e| e.to_string()).unwrap_or_default()
        )))
    }
}

pub fn high_risk_alert_subject(site_id: &str) -> String {
    format!("⚠️ High Site Risk Alert – {site_id}")
}

pub fn high_risk_alert_body(assessment: &SiteAssessment) -> String {
    format!(
        "⚠️ HIGH SITE RISK ALERT

Site ID: {site_id}

Weighted Site Risk Score: {score}
Site Severity: {severity}

Most Frequent Hazards:
{hazards}

Assessment Time:
{ts}

This alert was automatically generated due to high site risk.
Immediate review and mitigation is recommended.
",
        site_id = assessment.site_id,
        score = assessment.summary.weighted_risk_score,
        severity = assessment.summary.site_severity,
        hazards = hazard_lines(assessment),
        ts = assessment.inspection_ts,
    )
}

pub fn assessment_subject(site_id: &str) -> String {
    format!("Site Safety Risk Assessment – {site_id}")
}

pub fn assessment_body(assessment: &SiteAssessment) -> String {
    format!(
        "⚠️ SITE SAFETY RISK ASSESSMENT

SITE ID: {site_id}
ASSESSMENT TIME: {ts}

WEIGHTED SITE RISK SCORE: {score}
SITE SEVERITY: {severity}

MOST FREQUENT HAZARDS:
{hazards}

TOP 3 PRIORITIZED CORRECTIVE ACTIONS:
{actions}

This assessment was generated automatically from visible site conditions
and is intended to assist safety inspections.
",
        site_id = assessment.site_id,
        ts = assessment.inspection_ts,
        score = assessment.summary.weighted_risk_score,
        severity = assessment.summary.site_severity,
        hazards = hazard_lines(assessment),
        actions = action_lines(assessment),
    )
}

fn hazard_lines(assessment: &SiteAssessment) -> String {
    if assessment.summary.hazard_counts.is_empty() {
        return "- None".to_string();
    }
    assessment
        .summary
        .hazard_counts
        .iter()
        .map(|h| format!("- {}: {} images", h.category, h.count))
        .collect::<Vec<_>>()
        .join("\n")
}

fn action_lines(assessment: &SiteAssessment) -> String {
    match &assessment.prioritized_actions {
        Some(actions) if !actions.is_empty() => actions
            .iter()
            .map(|a| format!("- {a}"))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => "- No actions identified.".to_string(),
    }
}
