// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Cleans raw poem files before the vocabulary is built.
//
// Every distinct character becomes a vocabulary entry, so stray
// Windows line endings, tabs or zero-width spaces would each cost
// a slot and teach the model noise.
//
// Cleaning steps (applied in order):
//   1. CRLF / lone CR → LF
//   2. Tabs and Unicode space variants → plain space
//   3. Other control characters (except LF) removed
//   4. Trailing whitespace trimmed per line
//      (leading indentation is part of a poem's shape and kept)
//
// Splitting:
//   Two or more consecutive blank lines separate poems.
//   A single blank line is a stanza break and stays inside
//   the poem.
//
// Reference: Rust Book §8 (Strings in Rust)
//            Rust Book §13 (Iterators)

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Normalise characters and strip trailing whitespace per line.
    pub fn clean(&self, text: &str) -> String {
        let unified = text.replace("\r\n", "\n").replace('\r', "\n");

        let normalised: String = unified
            .chars()
            .filter_map(|c| match c {
                '\t' | '\u{00A0}' | '\u{2009}' | '\u{3000}' => Some(' '),
                '\u{200B}' | '\u{FEFF}' => None,
                '\n' => Some('\n'),
                c if c.is_control() => None,
                c => Some(c),
            })
            .collect();

        normalised
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Clean a whole file and split it into individual poems.
    pub fn split_poems(&self, text: &str) -> Vec<String> {
        let cleaned = self.clean(text);

        let mut poems  = Vec::new();
        let mut stanza = Vec::new();
        let mut blanks = 0usize;

        for line in cleaned.lines() {
            if line.is_empty() {
                blanks += 1;
                continue;
            }
            if blanks >= 2 {
                push_poem(&mut poems, &mut stanza);
            } else if blanks == 1 && !stanza.is_empty() {
                stanza.push("");
            }
            blanks = 0;
            stanza.push(line);
        }
        push_poem(&mut poems, &mut stanza);

        poems
    }
}

fn push_poem(poems: &mut Vec<String>, lines: &mut Vec<&str>) {
    if !lines.is_empty() {
        poems.push(lines.join("\n"));
        lines.clear();
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}
