use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Key of the answer-evaluation template.
pub const EVALUATE_ANSWER: &str = "evaluate_answer";
/// Key of the follow-up question template.
pub const GENERATE_QUESTION: &str = "generate_question";

const DEFAULT_EVALUATE_ANSWER: &str = r#"You are an expert interview coach evaluating a candidate's answer.

Question: {question}
Topic: {topic}
Candidate's Answer: {answer}

Evaluate this answer on a scale of 0-10 considering:
1. Completeness and depth
2. Use of STAR method (Situation, Task, Action, Result) for behavioral questions
3. Technical accuracy for technical questions
4. Specific examples and metrics
5. Clarity and communication

Respond STRICTLY as a JSON object:
{"score": <number 0-10>, "weak_points": ["<weakness 1>", "<weakness 2>", "<weakness 3>"]}

Be constructive and specific. Do NOT add anything outside the JSON."#;

const DEFAULT_GENERATE_QUESTION: &str = r#"You are an expert interview coach creating personalized interview questions.

Generate a {difficulty} difficulty {topic} interview question.

Context:
- The candidate is weakest in: {weak_topics}
- Focus the question on helping them improve these areas
- Make it realistic and commonly asked in real interviews

Provide ONLY the question, no additional commentary."#;

/// Prompt templates with `{placeholder}` slots.
///
/// Starts from built-in defaults; any `<key>.md` file in an override
/// directory replaces the template of the same key.
#[derive(Debug, Clone)]
pub struct PromptSet {
    templates: HashMap<String, String>,
}

impl Default for PromptSet {
    fn default() -> Self {
        let templates = HashMap::from([
            (EVALUATE_ANSWER.to_string(), DEFAULT_EVALUATE_ANSWER.to_string()),
            (GENERATE_QUESTION.to_string(), DEFAULT_GENERATE_QUESTION.to_string()),
        ]);
        Self { templates }
    }
}

impl PromptSet {
    /// Loads the defaults and overlays every `.md` file found in `dir_path`.
    pub fn with_overrides(dir_path: &Path) -> Result<Self> {
        let mut set = Self::default();
        set.templates.extend(load_prompts(dir_path)?);
        Ok(set)
    }

    pub fn template(&self, key: &str) -> Option<&str> {
        self.templates.get(key).map(String::as_str)
    }

    /// Fills `{name}` slots of the template `key`. Unknown slots are left as-is.
    ///
    /// Only the template is scanned, so substituted values are never rendered again.
    pub fn render(&self, key: &str, vars: &[(&str, &str)]) -> Option<String> {
        let mut rest = self.template(key)?;
        let mut out = String::with_capacity(rest.len());
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let slot = after
                .find('}')
                .map(|close| &after[..close])
                .and_then(|name| vars.iter().find(|(var, _)| *var == name));
            match slot {
                Some((name, value)) => {
                    out.push_str(value);
                    rest = &after[name.len() + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        Some(out)
    }
}

/// Reads every `.md` file in a directory, keyed by file stem.
pub fn load_prompts(dir_path: &Path) -> Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();

    for entry in fs::read_dir(dir_path)
        .with_context(|| format!("Failed to read prompts directory: {}", dir_path.display()))?
    {
        let path = entry?.path();

        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem for prompt file")?
                .to_string();

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read prompt file: {}", path.display()))?;

            prompts.insert(key, content);
        }
    }

    Ok(prompts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn defaults_render_placeholders() {
        let prompts = PromptSet::default();
        let rendered = prompts
            .render(
                GENERATE_QUESTION,
                &[("difficulty", "hard"), ("topic", "algorithms"), ("weak_topics", "leadership")],
            )
            .unwrap();
        assert!(rendered.contains("Generate a hard difficulty algorithms interview question."));
        assert!(rendered.contains("weakest in: leadership"));
        assert!(!rendered.contains("{topic}"));
    }

    #[test]
    fn evaluation_template_keeps_json_braces() {
        let prompts = PromptSet::default();
        let rendered = prompts
            .render(EVALUATE_ANSWER, &[("question", "Q?"), ("topic", "t"), ("answer", "A.")])
            .unwrap();
        assert!(rendered.contains("Question: Q?"));
        assert!(rendered.contains(r#"{"score": <number 0-10>"#));
    }

    #[test]
    fn substituted_text_is_not_rendered_again() {
        let prompts = PromptSet::default();
        let rendered = prompts
            .render(
                EVALUATE_ANSWER,
                &[
                    ("question", "Why is {answer} here?"),
                    ("answer", "my {topic} answer"),
                    ("topic", "algorithms"),
                ],
            )
            .unwrap();
        assert!(rendered.contains("Question: Why is {answer} here?"));
        assert!(rendered.contains("Candidate's Answer: my {topic} answer"));
        assert!(rendered.contains("Topic: algorithms"));
    }

    #[test]
    fn unknown_template_renders_none() {
        assert!(PromptSet::default().render("missing", &[]).is_none());
    }

    #[test]
    fn overrides_replace_defaults_and_ignore_other_files() -> Result<()> {
        let dir = tempdir()?;
        let dir_path = dir.path();

        let mut file = File::create(dir_path.join("generate_question.md"))?;
        write!(file, "Ask one {{difficulty}} question about {{topic}}.")?;

        let mut ignored = File::create(dir_path.join("notes.txt"))?;
        writeln!(ignored, "not a prompt")?;
        std::fs::create_dir(dir_path.join("subdir"))?;

        let prompts = PromptSet::with_overrides(dir_path)?;
        assert_eq!(
            prompts
                .render(GENERATE_QUESTION, &[("difficulty", "easy"), ("topic", "leadership")])
                .as_deref(),
            Some("Ask one easy question about leadership.")
        );
        assert!(prompts.template(EVALUATE_ANSWER).is_some());
        assert!(prompts.template("notes").is_none());
        Ok(())
    }

    #[test]
    fn load_prompts_from_nonexistent_dir_fails() {
        let result = load_prompts(Path::new("nonexistent_dir_for_testing_prompts"));
        assert!(result.is_err());
    }
}
