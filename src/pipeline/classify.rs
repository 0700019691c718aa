// src/pipeline/classify.rs

//! Taxonomy classification over collected repositories.
//!
//! A pure post-processing pass: reads the repository CSV, assigns each
//! row a best-matching category, and writes the classified CSV plus a
//! mapping/statistics JSON.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{CategoryConfig, Config, DataFiles};

/// Fallback category for repositories matching no taxonomy topic.
const OTHERS: &str = "Others";

/// Summary of one classification pass.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifySummary {
    pub total: usize,
    pub categories: BTreeMap<String, u64>,
}

/// Mapping file written alongside the classified CSV.
#[derive(Debug, Serialize)]
struct TaxonomyMapping {
    taxonomy: BTreeMap<String, Vec<String>>,
    priority_order: Vec<String>,
    statistics: BTreeMap<String, u64>,
    topic_frequency: BTreeMap<String, u64>,
}

/// Classify a `;`-joined topics string into one category name.
///
/// The category with the most topic hits wins; ties go to the category
/// listed first in the taxonomy.
pub fn classify_topics(topics: &str, taxonomy: &[CategoryConfig]) -> String {
    let topic_set: HashSet<&str> = topics.split(';').filter(|t| !t.is_empty()).collect();
    if topic_set.is_empty() {
        return OTHERS.to_string();
    }

    let mut best: Option<(&str, usize)> = None;
    for category in taxonomy {
        let score = category
            .topics
            .iter()
            .filter(|topic| topic_set.contains(topic.as_str()))
            .count();
        if score > 0 && best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((&category.name, score));
        }
    }

    best.map(|(name, _)| name.to_string())
        .unwrap_or_else(|| OTHERS.to_string())
}

/// Read the repository CSV, append a `category` column, and write the
/// classified CSV plus the taxonomy mapping JSON.
pub fn run_classifier(config: &Config, files: &DataFiles) -> Result<ClassifySummary> {
    log::info!("Starting taxonomy classification");

    let mut reader = csv::Reader::from_path(&files.repos_csv)?;
    let headers = reader.headers()?.clone();
    let topics_index = headers
        .iter()
        .position(|name| name == "topics")
        .ok_or_else(|| AppError::malformed("repository CSV has no topics column"))?;

    let mut writer = csv::Writer::from_path(&files.classified_csv)?;
    let mut out_headers = headers.clone();
    out_headers.push_field("category");
    writer.write_record(&out_headers)?;

    let mut topic_frequency: BTreeMap<String, u64> = BTreeMap::new();
    let mut statistics: BTreeMap<String, u64> = BTreeMap::new();
    let mut total = 0usize;

    for record in reader.records() {
        let record = record?;
        let topics = record.get(topics_index).unwrap_or("");

        for topic in topics.split(';').filter(|t| !t.is_empty()) {
            *topic_frequency.entry(topic.to_string()).or_default() += 1;
        }

        let category = classify_topics(topics, &config.taxonomy);
        *statistics.entry(category.clone()).or_default() += 1;

        let mut out = record.clone();
        out.push_field(&category);
        writer.write_record(&out)?;
        total += 1;
    }
    writer.flush()?;

    log::info!(
        "Classified {} repositories into {} categories",
        total,
        statistics.len()
    );
    for (category, count) in &statistics {
        let percentage = if total > 0 {
            *count as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        log::info!("  {category}: {count} ({percentage:.1}%)");
    }

    let mapping = TaxonomyMapping {
        taxonomy: config
            .taxonomy
            .iter()
            .map(|category| (category.name.clone(), category.topics.clone()))
            .collect(),
        priority_order: config
            .taxonomy
            .iter()
            .map(|category| category.name.clone())
            .collect(),
        statistics: statistics.clone(),
        topic_frequency,
    };
    let json = serde_json::to_string_pretty(&mapping)?;
    std::fs::write(&files.taxonomy_json, json)?;

    log::info!(
        "Classified data saved to {}",
        files.classified_csv.display()
    );

    Ok(ClassifySummary {
        total,
        categories: statistics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FilesConfig;
    use tempfile::TempDir;

    fn taxonomy() -> Vec<CategoryConfig> {
        vec![
            CategoryConfig {
                name: "AI_DataScience".to_string(),
                topics: vec!["machine-learning".to_string(), "nlp".to_string()],
            },
            CategoryConfig {
                name: "WebDevelopment".to_string(),
                topics: vec!["web".to_string(), "react".to_string()],
            },
        ]
    }

    #[test]
    fn highest_scoring_category_wins() {
        let category = classify_topics("web;react;nlp", &taxonomy());
        assert_eq!(category, "WebDevelopment");
    }

    #[test]
    fn ties_break_by_listing_order() {
        let category = classify_topics("machine-learning;web", &taxonomy());
        assert_eq!(category, "AI_DataScience");
    }

    #[test]
    fn no_hits_fall_back_to_others() {
        assert_eq!(classify_topics("embedded;no-std", &taxonomy()), "Others");
        assert_eq!(classify_topics("", &taxonomy()), "Others");
    }

    #[test]
    fn classifier_appends_category_column_and_writes_mapping() {
        let tmp = TempDir::new().unwrap();
        let files = FilesConfig::default().resolve(tmp.path());

        std::fs::write(
            &files.repos_csv,
            "repo_id,name,full_name,description,topics,language,stars_count,\
             forks_count,created_at,updated_at,url\n\
             R_1,demo,acme/demo,desc,web;react,Rust,10,2,2021,2024,https://x\n\
             R_2,tool,acme/tool,desc,embedded,C,5,1,2020,2023,https://y\n",
        )
        .unwrap();

        let mut config = Config::default();
        config.taxonomy = taxonomy();

        let summary = run_classifier(&config, &files).unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.categories["WebDevelopment"], 1);
        assert_eq!(summary.categories["Others"], 1);

        let classified = std::fs::read_to_string(&files.classified_csv).unwrap();
        let lines: Vec<&str> = classified.lines().collect();
        assert!(lines[0].ends_with(",category"));
        assert!(lines[1].ends_with(",WebDevelopment"));
        assert!(lines[2].ends_with(",Others"));

        let mapping: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&files.taxonomy_json).unwrap()).unwrap();
        assert_eq!(
            mapping["priority_order"][0].as_str(),
            Some("AI_DataScience")
        );
        assert_eq!(mapping["topic_frequency"]["web"].as_u64(), Some(1));
        assert_eq!(mapping["statistics"]["Others"].as_u64(), Some(1));
    }
}
