use std::collections::BTreeMap;

use regex::Regex;

/// Splits a raw input line into tokens.
///
/// Tokens are separated by whitespace, except that text between a pair of
/// double quotes stays together (quotes removed). There is no escape syntax;
/// an unclosed quote runs to the end of the line.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    // Distinguishes `""` (an empty token) from no token at all.
    let mut has_token = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if has_token {
        tokens.push(current);
    }

    tokens
}

/// True when the line opens a double quote it never closes.
pub fn has_unclosed_quote(line: &str) -> bool {
    line.matches('"').count() % 2 == 1
}

/// Positional arguments and `--key=value` flags of a command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedArgs {
    pub positional: Vec<String>,
    pub flags: BTreeMap<String, String>,
}

impl ParsedArgs {
    pub fn flag(&self, key: &str) -> Option<&str> {
        self.flags.get(key).map(String::as_str)
    }

    pub fn has_flag(&self, key: &str) -> bool {
        self.flags.contains_key(key)
    }
}

/// Separates `--key=value` and bare `--key` flags from positional arguments.
/// A bare flag maps to an empty value. `--` on its own is positional.
pub fn split_flags(args: &[String]) -> ParsedArgs {
    let mut parsed = ParsedArgs::default();

    for arg in args {
        match arg.strip_prefix("--") {
            Some(rest) if !rest.is_empty() => {
                let (key, value) = rest.split_once('=').unwrap_or((rest, ""));
                parsed
                    .flags
                    .insert(key.to_lowercase(), value.to_string());
            }
            _ => parsed.positional.push(arg.clone()),
        }
    }

    parsed
}

/// Extracts commands from fenced blocks in script text.
///
/// Recognised fences are ```` ```omega ````, ```` ```sh ````, ```` ```bash ````
/// and ```` ```command ````. Each non-empty line inside a block is one command.
/// Returns `None` when the text contains no such block.
pub fn parse_command_blocks(text: &str) -> Option<Vec<String>> {
    if !contains_command_blocks(text) {
        return None;
    }

    let mut commands = Vec::new();
    let mut in_block = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if !in_block {
            if is_block_opener(trimmed) {
                in_block = true;
            }
            continue;
        }

        if trimmed == "```" {
            in_block = false;
        } else if !trimmed.is_empty() {
            commands.push(trimmed.to_string());
        }
    }

    Some(commands)
}

fn is_block_opener(line: &str) -> bool {
    matches!(
        line,
        "```omega" | "```sh" | "```bash" | "```command"
    )
}

pub fn contains_command_blocks(text: &str) -> bool {
    match Regex::new(r"(?m)^\s*```(?:omega|bash|sh|command)\s*$") {
        Ok(pattern) => pattern.is_match(text),
        Err(_) => false,
    }
}

/// Commands of a plain script: one per line, `#` starts a comment line.
pub fn parse_script_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tokenize_quoted_argument() {
        let tokens = tokenize(r#"audit "contract Foo { }" --chain=bsc"#);
        assert_eq!(tokens, strings(&["audit", "contract Foo { }", "--chain=bsc"]));
    }

    #[test]
    fn test_tokenize_whitespace() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \t  ").is_empty());
        assert_eq!(tokenize("  balance   0xabc  "), strings(&["balance", "0xabc"]));
    }

    #[test]
    fn test_tokenize_edge_quotes() {
        assert_eq!(tokenize(r#"say """#), strings(&["say", ""]));
        assert_eq!(tokenize(r#"pre"fix part"post x"#), strings(&["prefix partpost", "x"]));
        assert_eq!(tokenize(r#"note "unterminated text"#), strings(&["note", "unterminated text"]));
    }

    #[test]
    fn test_unclosed_quote() {
        assert!(has_unclosed_quote(r#"audit "contract"#));
        assert!(!has_unclosed_quote(r#"audit "contract""#));
        assert!(!has_unclosed_quote("status"));
    }

    #[test]
    fn test_split_flags() {
        let args = strings(&["0xabc", "--type=ERC20", "--verbose", "--", "10"]);
        let parsed = split_flags(&args);

        assert_eq!(parsed.positional, strings(&["0xabc", "--", "10"]));
        assert_eq!(parsed.flag("type"), Some("ERC20"));
        assert!(parsed.has_flag("verbose"));
        assert_eq!(parsed.flag("verbose"), Some(""));
        assert_eq!(parsed.flag("missing"), None);
    }

    #[test]
    fn test_parse_command_blocks() {
        let input = r#"Set up the session first:

```omega
theme matrix
sound off
```

Then check where we are:

```sh
status
```

Done."#;

        let commands = parse_command_blocks(input).unwrap();
        assert_eq!(commands, strings(&["theme matrix", "sound off", "status"]));
    }

    #[test]
    fn test_contains_command_blocks() {
        assert!(contains_command_blocks("text\n```bash\nstatus\n```\n"));
        assert!(contains_command_blocks("```omega\nhelp\n```"));
        assert!(!contains_command_blocks("```rust\nfn main() {}\n```"));
        assert!(parse_command_blocks("help\nstatus\n").is_none());
    }

    #[test]
    fn test_parse_script_lines() {
        let script = "# setup\ntheme retro\n\n  status  \n#done\n";
        assert_eq!(parse_script_lines(script), strings(&["theme retro", "status"]));
    }
}
