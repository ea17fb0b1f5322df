//! Dataset card (`README.md`) for the remote repository.

use chrono::{DateTime, SecondsFormat, Utc};

use adoptedtexts_shared::SEED_TOC_URL;

/// Render the dataset card with YAML front matter pointing at `data_file`.
pub fn render_dataset_card(
    name: &str,
    data_file: &str,
    record_count: usize,
    generated_at: DateTime<Utc>,
) -> String {
    let generated = generated_at.to_rfc3339_opts(SecondsFormat::Secs, true);
    let pretty_name = name.replace('-', " ");

    format!(
        "---\n\
         language:\n\
         - nl\n\
         pretty_name: {pretty_name}\n\
         configs:\n\
         - config_name: default\n  \
           data_files:\n  \
           - split: train\n    \
             path: {data_file}\n\
         ---\n\
         \n\
         # {name}\n\
         \n\
         Adopted texts of the European Parliament in Dutch, collected by following the \
         \"Volgende\" links of the plenary tables of contents starting at <{SEED_TOC_URL}>.\n\
         \n\
         - Records: {record_count}\n\
         - Fields: `url` (content page URL), `text` (cleaned plain text)\n\
         - Generated: {generated}\n"
    )
}
