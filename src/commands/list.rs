//! List command handler

use anyhow::{Context, Result};

use regen::declarations::Declarations;
use regen::rules::RuleStore;
use regen::theme::current_theme;
use regen::Config;

/// Print every declared document with its done marker, sorted by service id.
#[cfg(not(tarpaulin_include))]
pub fn handle(config: &Config) -> Result<()> {
    let theme = current_theme();
    let declarations = Declarations::load(&config.paths.declarations, None).with_context(|| {
        format!(
            "Failed to load declarations from {}",
            config.paths.declarations.display()
        )
    })?;
    let rules = RuleStore::open(config.paths.rules_path())?;

    let documents = declarations.document_types();
    if documents.is_empty() {
        println!("{}", theme.secondary_text("No declared documents"));
        return Ok(());
    }

    for line in lines(&documents, &rules) {
        println!("{}", theme.primary_text(&line));
    }
    Ok(())
}

fn lines(documents: &[(String, String)], rules: &RuleStore) -> Vec<String> {
    documents
        .iter()
        .map(|(service_id, document_type)| {
            let marker = if rules.is_document_done(service_id, document_type) {
                "✅"
            } else {
                "❌"
            };
            format!("{} {} {}", marker, service_id, document_type)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn done_documents_are_checked() {
        let dir = TempDir::new().unwrap();
        let mut rules = RuleStore::open(dir.path().join("index.json")).unwrap();
        rules.mark_as_done("a-service", "Privacy Policy").unwrap();

        let documents = vec![
            ("a-service".to_string(), "Privacy Policy".to_string()),
            ("b-service".to_string(), "Terms of Service".to_string()),
        ];
        assert_eq!(
            lines(&documents, &rules),
            vec![
                "✅ a-service Privacy Policy",
                "❌ b-service Terms of Service"
            ]
        );
    }
}
