//! Streaming Text Hygiene
//!
//! Models narrate tool plans inside ```-fenced blocks before calling
//! tools. Those blocks are internal scaffolding and must not reach the
//! client token stream. [`FenceFilter`] removes fenced spans from an
//! incremental token stream without re-emitting or dropping legitimate
//! text around them.

/// Incremental code-fence suppressor.
///
/// Feed raw deltas with [`push`](Self::push); it returns the newly
/// emittable cleaned text. A fence marker is a run of three or more
/// backticks; markers toggle suppression and are themselves suppressed,
/// as is everything between a pair (info string included). A trailing
/// backtick run is withheld until the next delta classifies it, so a
/// closing fence split across deltas never leaks.
#[derive(Debug, Default)]
pub struct FenceFilter {
    raw: String,
    emitted: usize,
}

impl FenceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb a raw delta, return the newly safe cleaned text.
    pub fn push(&mut self, token: &str) -> String {
        self.raw.push_str(token);
        let cleaned = Self::clean(&self.raw);
        // Cleaned output is prefix-stable: resolved text never gets
        // reclassified, so emitting the suffix is sound.
        let fresh = cleaned[self.emitted..].to_string();
        self.emitted = cleaned.len();
        fresh
    }

    /// Drop all scope; text before and after a tool call are separate
    /// fence scopes.
    pub fn reset(&mut self) {
        self.raw.clear();
        self.emitted = 0;
    }

    /// Cleaned rendition of `raw`. A backtick run at the very end is
    /// unresolved and excluded entirely (no toggle, no output).
    fn clean(raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        let mut open = false;
        let mut chars = raw.char_indices().peekable();

        while let Some((start, c)) = chars.next() {
            if c != '`' {
                if !open {
                    out.push(c);
                }
                continue;
            }

            // Measure the backtick run.
            let mut len = 1;
            let mut end = start + c.len_utf8();
            while let Some(&(i, next)) = chars.peek() {
                if next != '`' {
                    break;
                }
                len += 1;
                end = i + next.len_utf8();
                chars.next();
            }

            if end == raw.len() {
                // Unresolved trailing run: hold it back.
                break;
            }

            if len >= 3 {
                open = !open;
            } else if !open {
                for _ in 0..len {
                    out.push('`');
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_chars(filter: &mut FenceFilter, text: &str) -> Vec<String> {
        text.chars()
            .map(|c| filter.push(&c.to_string()))
            .collect()
    }

    #[test]
    fn test_plain_text_passes_through() {
        let mut filter = FenceFilter::new();
        assert_eq!(filter.push("기준금리는 "), "기준금리는 ");
        assert_eq!(filter.push("5.33%입니다."), "5.33%입니다.");
    }

    #[test]
    fn test_fenced_block_suppressed_text_after_survives() {
        let mut filter = FenceFilter::new();
        let outputs = feed_chars(&mut filter, "```json\n{\"a\":1}\n```Hello");

        let boundary = outputs.len() - "Hello".chars().count();
        assert!(
            outputs[..boundary].iter().all(String::is_empty),
            "nothing may leak before the fence closes"
        );
        assert_eq!(outputs.concat(), "Hello");
    }

    #[test]
    fn test_text_before_fence_is_emitted() {
        let mut filter = FenceFilter::new();
        let outputs = feed_chars(&mut filter, "계획: ```json\n{}\n``` 실행합니다");
        assert_eq!(outputs.concat(), "계획:  실행합니다");
    }

    #[test]
    fn test_inline_code_backticks_survive() {
        let mut filter = FenceFilter::new();
        let outputs = feed_chars(&mut filter, "see `CPIAUCSL` here");
        assert_eq!(outputs.concat(), "see `CPIAUCSL` here");
    }

    #[test]
    fn test_split_closing_fence_never_leaks() {
        let mut filter = FenceFilter::new();
        assert_eq!(filter.push("```json\n{}"), "");
        assert_eq!(filter.push("\n`"), "");
        assert_eq!(filter.push("`"), "");
        assert_eq!(filter.push("`"), "");
        assert_eq!(filter.push("done"), "done");
    }

    #[test]
    fn test_multiple_fences_in_one_scope() {
        let mut filter = FenceFilter::new();
        let outputs = feed_chars(&mut filter, "a```x```b```y```c");
        assert_eq!(outputs.concat(), "abc");
    }

    #[test]
    fn test_no_reemission_across_pushes() {
        let mut filter = FenceFilter::new();
        let mut total = String::new();
        total.push_str(&filter.push("Hel"));
        total.push_str(&filter.push("lo"));
        total.push_str(&filter.push(" world"));
        assert_eq!(total, "Hello world");
    }

    #[test]
    fn test_reset_clears_open_fence() {
        let mut filter = FenceFilter::new();
        assert_eq!(filter.push("```json\n{\"plan\":"), "");
        filter.reset();
        // New scope after a tool call: suppression does not carry over.
        assert_eq!(filter.push("결과를 보면"), "결과를 보면");
    }

    #[test]
    fn test_trailing_short_run_held_then_released() {
        let mut filter = FenceFilter::new();
        assert_eq!(filter.push("a`"), "a");
        assert_eq!(filter.push("b"), "`b");
    }
}
