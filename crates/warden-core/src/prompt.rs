//! Prompt builder for AI interactions
//!
//! Builds the narrative-analysis prompt from a rendered health report.

use crate::ports::ai::{AIError, TextPrompt};
use chrono::NaiveDateTime;

/// Builder for constructing text prompts
pub struct PromptBuilder;

impl PromptBuilder {
    /// Builds the health analysis prompt
    ///
    /// # Arguments
    /// * `report` - Rendered health report text
    /// * `now` - Local time the report was generated, passed so the analysis can refer to it
    ///
    /// # Returns
    /// * `Ok(TextPrompt)` - Successfully constructed prompt
    /// * `Err(AIError::InvalidRequest)` - If the report is empty
    ///
    /// # Example
    /// ```
    /// use chrono::NaiveDate;
    /// use warden_core::prompt::PromptBuilder;
    ///
    /// let now = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap().and_hms_opt(20, 0, 0).unwrap();
    /// let prompt = PromptBuilder::build_health_prompt("📋 Entities: 5", now)
    ///     .expect("Failed to build prompt");
    ///
    /// assert!(prompt.user_text.contains("📋 Entities: 5"));
    /// ```
    pub fn build_health_prompt(report: &str, now: NaiveDateTime) -> Result<TextPrompt, AIError> {
        let trimmed_report = report.trim();
        if trimmed_report.is_empty() {
            return Err(AIError::InvalidRequest(
                "Report cannot be empty".to_string(),
            ));
        }

        Ok(TextPrompt {
            system_message: Self::build_system_message(),
            user_text: Self::build_user_text(trimmed_report, now),
        })
    }

    fn build_system_message() -> String {
        "You review Home Assistant installations for their owners. \
Be concrete and brief, and only refer to facts present in the report."
            .to_string()
    }

    fn build_user_text(report: &str, now: NaiveDateTime) -> String {
        format!(
            "Analyze the following Home Assistant system report and provide insights, \
potential problems, and optimization suggestions. \
Include the current date and time in your analysis.\n\
Current date and time: {} ({})\n\n{}",
            now.format("%Y-%m-%d %H:%M"),
            now.format("%A"),
            report
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn instant() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(20, 5, 9)
            .unwrap()
    }

    #[test]
    fn test_prompt_embeds_report() {
        let report = "📋 Entities: 5\n📡 Devices: 2";
        let prompt = PromptBuilder::build_health_prompt(report, instant()).unwrap();

        assert!(prompt.user_text.ends_with(report));
        assert!(prompt.user_text.contains("optimization suggestions"));
        assert!(!prompt.system_message.is_empty());
    }

    #[test]
    fn test_prompt_includes_date_and_weekday() {
        let prompt = PromptBuilder::build_health_prompt("report", instant()).unwrap();

        assert!(prompt.user_text.contains("2024-06-15 20:05"));
        assert!(prompt.user_text.contains("Saturday"));
    }

    #[test]
    fn test_empty_report_rejected() {
        let result = PromptBuilder::build_health_prompt("  \n\t ", instant());

        match result {
            Err(AIError::InvalidRequest(msg)) => assert!(msg.contains("empty")),
            other => panic!("Expected InvalidRequest error, got {:?}", other),
        }
    }

    #[test]
    fn test_report_is_trimmed() {
        let prompt = PromptBuilder::build_health_prompt("\n  body  \n", instant()).unwrap();
        assert!(prompt.user_text.ends_with("\n\nbody"));
    }
}
