//! Splitting long text for a model with a bounded input size
//!
//! [`Chunker::split`] packs text greedily on the coarsest boundary that
//! works: paragraphs, then lines, then sentences. Anything still too long
//! after sentence packing is cut into fixed windows. Sizes are measured in
//! characters, not bytes.

/// Boundaries tried in order, coarsest first, with the text that rejoins
/// pieces packed into one chunk. Pieces keep their terminator.
const SEPARATORS: &[(&str, &str)] = &[("\n\n", "\n\n"), ("\n", "\n"), (". ", " ")];

/// Text chunker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
}

impl Chunker {
    /// Create a chunker; a zero size is treated as one character
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Maximum characters per chunk
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Split on natural boundaries; every chunk is non-empty, trimmed, and at
    /// most `chunk_size` characters
    pub fn split(&self, text: &str) -> Vec<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        if char_len(trimmed) <= self.chunk_size {
            return vec![trimmed.to_string()];
        }
        let mut chunks = Vec::new();
        self.split_with(trimmed, 0, &mut chunks);
        chunks
    }

    /// Plain fixed windows of `chunk_size` characters, no trimming
    pub fn split_fixed(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        chars
            .chunks(self.chunk_size)
            .map(|window| window.iter().collect())
            .collect()
    }

    fn split_with(&self, text: &str, level: usize, out: &mut Vec<String>) {
        let Some(&(separator, joiner)) = SEPARATORS.get(level) else {
            out.extend(
                self.split_fixed(text)
                    .into_iter()
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty()),
            );
            return;
        };

        let mut current = String::new();
        for piece in text.split_inclusive(separator) {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }

            if char_len(piece) > self.chunk_size {
                flush(&mut current, out);
                self.split_with(piece, level + 1, out);
                continue;
            }

            let joined_len = if current.is_empty() {
                char_len(piece)
            } else {
                char_len(&current) + char_len(joiner) + char_len(piece)
            };
            if joined_len > self.chunk_size {
                flush(&mut current, out);
            }
            if !current.is_empty() {
                current.push_str(joiner);
            }
            current.push_str(piece);
        }
        flush(&mut current, out);
    }
}

fn flush(current: &mut String, out: &mut Vec<String>) {
    let chunk = current.trim();
    if !chunk.is_empty() {
        out.push(chunk.to_string());
    }
    current.clear();
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
