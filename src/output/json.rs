use anyhow::{Context, Result};
use serde::Serialize;

pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed encoding JSON output")
}

#[cfg(test)]
mod tests {
    use crate::output::json::render_json;
    use crate::race::Race;

    #[test]
    fn renders_rows_in_table_shape() {
        let rendered = render_json(&[Race::new("IL", "HD-48")]).expect("races should encode");
        assert!(rendered.contains("\"state\": \"IL\""));
        assert!(rendered.contains("\"issueOrgs\": 0.0"));
    }
}
