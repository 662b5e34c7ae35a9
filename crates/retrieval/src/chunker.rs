//! Sentence-aware document chunker.
//!
//! Splits long text into overlapping, sentence-bounded segments of
//! bounded word length. Sentences never straddle a chunk boundary;
//! consecutive chunks share a trailing-sentence overlap window so
//! cross-chunk context survives retrieval.

use serde::{Deserialize, Serialize};

/// A sentence-bounded segment of a source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub title: String,
    pub sequence_index: usize,
}

/// Splits text on terminal punctuation (`.` `!` `?` followed by
/// whitespace), greedily packing sentences up to `chunk_size` words.
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    overlap_fraction: f32,
}

impl Chunker {
    pub fn new(chunk_size: usize, overlap_fraction: f32) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            overlap_fraction: overlap_fraction.clamp(0.0, 0.99),
        }
    }

    /// Chunk `text` into ordered segments. Empty or whitespace-only
    /// input yields an empty vec. Never fails; a single sentence longer
    /// than `chunk_size` is emitted as its own chunk.
    pub fn chunk(&self, text: &str, title: &str) -> Vec<Chunk> {
        let sentences = split_sentences(text);
        if sentences.is_empty() {
            return Vec::new();
        }

        let mut chunks: Vec<Chunk> = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_words = 0usize;

        for sentence in sentences {
            let words = word_count(sentence);

            if !current.is_empty() && current_words + words > self.chunk_size {
                chunks.push(self.finish(&current, title, chunks.len()));

                // Seed the next chunk with a trailing-sentence window,
                // shrunk until the incoming sentence still fits.
                let mut overlap = self.overlap_count(current.len());
                loop {
                    let tail = &current[current.len() - overlap..];
                    let tail_words: usize = tail.iter().map(|s| word_count(s)).sum();
                    if overlap == 0 || tail_words + words <= self.chunk_size {
                        current = tail.to_vec();
                        current_words = tail_words;
                        break;
                    }
                    overlap -= 1;
                }
            }

            current.push(sentence);
            current_words += words;
        }

        if !current.is_empty() {
            chunks.push(self.finish(&current, title, chunks.len()));
        }
        chunks
    }

    fn finish(&self, sentences: &[&str], title: &str, index: usize) -> Chunk {
        Chunk {
            text: sentences.join(" "),
            title: title.to_string(),
            sequence_index: index,
        }
    }

    /// How many trailing sentences of a closed chunk to carry forward.
    /// At least one whenever the chunk had more than one sentence.
    fn overlap_count(&self, sentence_count: usize) -> usize {
        if self.overlap_fraction == 0.0 || sentence_count < 2 {
            return 0;
        }
        let count = (sentence_count as f32 * self.overlap_fraction).ceil() as usize;
        count.clamp(1, sentence_count - 1)
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(512, 0.1)
    }
}

/// Split on `.` `!` `?` followed by whitespace; punctuation stays with
/// its sentence. A trailing fragment without terminal punctuation is
/// kept as a sentence.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let bytes = text.as_bytes();
    let mut start = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        let c = bytes[i];
        if (c == b'.' || c == b'!' || c == b'?')
            && bytes.get(i + 1).is_some_and(|n| n.is_ascii_whitespace())
        {
            let sentence = text[start..=i].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = i + 1;
        }
        i += 1;
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
