//! Output functions for consistent build log formatting

use console::style;

const HEADER_INDENT: &str = "  ";
const BODY_INDENT: &str = "    ";
const OUTPUT_INDENT: &str = "      ";

/// Display the buildpack title line
pub fn title(name: &str, version: &str, homepage: Option<&str>) {
    println!("{} {}", style(name).bold(), version);
    if let Some(homepage) = homepage {
        println!("{}{}", HEADER_INDENT, style(homepage).cyan().dim());
    }
}

/// Display a section header
pub fn header(message: &str) {
    println!("{}{}", HEADER_INDENT, message);
}

/// Display a body line under the current header
pub fn body(message: &str) {
    for line in message.lines() {
        println!("{}{}", BODY_INDENT, line);
    }
}

/// Display a line of external command output
pub fn output(line: &str) {
    println!("{}{}", OUTPUT_INDENT, style(line).dim());
}

/// Display a warning
pub fn warn(message: &str) {
    println!("{}{} {}", HEADER_INDENT, style("Warning:").yellow().bold(), message);
}

/// Display aligned configuration rows of `(key, value, description)`
pub fn config_table(rows: &[(String, String, String)]) {
    if rows.is_empty() {
        return;
    }

    header("Build Configuration:");
    let key_width = rows.iter().map(|(k, _, _)| k.len() + 1).max().unwrap_or(0);
    let value_width = rows.iter().map(|(_, v, _)| v.len()).max().unwrap_or(0);

    for (key, value, description) in rows {
        let key = format!("${}", key);
        body(&format!(
            "{:<kw$}  {:<vw$}  {}",
            key,
            value,
            description,
            kw = key_width,
            vw = value_width
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_does_not_panic() {
        title("Solana Buildpack", "0.3.0", Some("https://example.com"));
        header("Solana CLI 1.17.17: Contributing to layer");
        body("Expanding archive\nSetting PATH");
        output("Finished release [optimized] target(s)");
        warn("dependency is deprecated");
        config_table(&[(
            "BP_SOLANA_CLI_VERSION".to_string(),
            "1.17.*".to_string(),
            "the Solana CLI version".to_string(),
        )]);
        config_table(&[]);
    }
}
