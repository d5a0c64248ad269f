use crate::scanner::Document;
use crate::util::estimate_tokens_for_text;
use anyhow::{bail, Result};

/// Soft ceiling per context payload, in estimated tokens.
pub const TARGET_CHUNK_TOKENS: usize = 4000;

/// One document's contribution to a chunk. For a document that had to be
/// split, several parts share the same source name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPart {
    pub source: String,
    pub text: String,
}

/// A bounded group of whole or partial documents sent as one API payload.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// 1-based position within the split.
    pub index: usize,
    pub total: usize,
    pub tokens: usize,
    pub parts: Vec<ChunkPart>,
}

impl Chunk {
    /// Render the payload text for this chunk.
    pub fn text(&self) -> String {
        let pieces: Vec<&str> = self.parts.iter().map(|p| p.text.as_str()).collect();
        pieces.join("\n")
    }
}

/// Greedy first-fit partitioner over an ordered document list.
///
/// Documents stay whole within one chunk unless a single document alone
/// exceeds the target, in which case it is split at line boundaries and
/// each segment emitted as its own chunk.
pub struct ContextChunker {
    target_tokens: usize,
}

impl ContextChunker {
    pub fn new(target_tokens: usize) -> Result<Self> {
        if target_tokens == 0 {
            bail!("chunk target size must be positive");
        }
        Ok(Self { target_tokens })
    }

    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut pending: Vec<(usize, Vec<ChunkPart>)> = Vec::new();
        let mut parts: Vec<ChunkPart> = Vec::new();
        let mut tokens = 0usize;

        for doc in documents {
            let size = estimate_tokens_for_text(&doc.text);
            if size > self.target_tokens {
                if !parts.is_empty() {
                    pending.push((tokens, std::mem::take(&mut parts)));
                    tokens = 0;
                }
                for segment in self.split_oversized(&doc.text) {
                    let seg_tokens = estimate_tokens_for_text(&segment);
                    let part = ChunkPart { source: doc.source.clone(), text: segment };
                    pending.push((seg_tokens, vec![part]));
                }
            } else if tokens + size > self.target_tokens && !parts.is_empty() {
                pending.push((tokens, std::mem::take(&mut parts)));
                parts.push(ChunkPart { source: doc.source.clone(), text: doc.text.clone() });
                tokens = size;
            } else {
                parts.push(ChunkPart { source: doc.source.clone(), text: doc.text.clone() });
                tokens += size;
            }
        }
        if !parts.is_empty() {
            pending.push((tokens, parts));
        }

        // Total is only known after the full pass; back-fill positions now.
        let total = pending.len();
        pending
            .into_iter()
            .enumerate()
            .map(|(i, (tokens, parts))| Chunk { index: i + 1, total, tokens, parts })
            .collect()
    }

    /// Split one oversized document into contiguous segments at or under
    /// the target size. Boundaries land on line breaks; a single line
    /// longer than the whole budget falls back to a raw character cut.
    /// Concatenating the segments reproduces the input exactly.
    fn split_oversized(&self, text: &str) -> Vec<String> {
        let max_chars = self.target_tokens.saturating_mul(4);
        let mut segments: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_chars = 0usize;

        for line in text.split_inclusive('\n') {
            let line_chars = line.chars().count();
            if current_chars + line_chars > max_chars && !current.is_empty() {
                segments.push(std::mem::take(&mut current));
                current_chars = 0;
            }
            if line_chars > max_chars {
                let mut rest = line;
                while let Some((cut, _)) = rest.char_indices().nth(max_chars) {
                    segments.push(rest[..cut].to_string());
                    rest = &rest[cut..];
                }
                // The tail starts the next segment so later lines can join it.
                current.push_str(rest);
                current_chars = rest.chars().count();
            } else {
                current.push_str(line);
                current_chars += line_chars;
            }
        }
        if !current.is_empty() {
            segments.push(current);
        }
        segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::FileCategory;

    fn doc(source: &str, text: String) -> Document {
        Document { source: source.to_string(), category: FileCategory::RuleFile, text }
    }

    fn doc_of_tokens(source: &str, tokens: usize) -> Document {
        doc(source, "x".repeat(tokens * 4))
    }

    #[test]
    fn zero_target_is_rejected() {
        assert!(ContextChunker::new(0).is_err());
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let chunker = ContextChunker::new(100).unwrap();
        assert!(chunker.chunk_documents(&[]).is_empty());
    }

    #[test]
    fn flushes_when_next_document_would_overflow() {
        // 3000 + 2000 > 4000, so A is flushed alone and B starts the next
        // chunk; C still fits beside B.
        let docs = vec![
            doc_of_tokens("a.java", 3000),
            doc_of_tokens("b.drl", 2000),
            doc_of_tokens("c.drl", 1500),
        ];
        let chunker = ContextChunker::new(4000).unwrap();
        let chunks = chunker.chunk_documents(&docs);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].tokens, 3000);
        assert_eq!(chunks[0].parts.len(), 1);
        assert_eq!(chunks[0].parts[0].source, "a.java");
        assert_eq!(chunks[1].tokens, 3500);
        assert_eq!(chunks[1].parts.len(), 2);
        assert_eq!((chunks[0].index, chunks[0].total), (1, 2));
        assert_eq!((chunks[1].index, chunks[1].total), (2, 2));
    }

    #[test]
    fn no_chunk_exceeds_target() {
        let docs: Vec<Document> = (0..20)
            .map(|i| doc_of_tokens(&format!("f{}.drl", i), 7 * (i % 5) + 3))
            .collect();
        let chunker = ContextChunker::new(40).unwrap();
        for chunk in chunker.chunk_documents(&docs) {
            assert!(chunk.tokens <= 40, "chunk {} has {} tokens", chunk.index, chunk.tokens);
        }
    }

    #[test]
    fn concatenated_parts_round_trip() {
        let docs = vec![
            doc("a", "rule one\nend\n".to_string()),
            doc("b", "rule two\nend\n".to_string()),
            doc("c", "rule three\nend\n".to_string()),
        ];
        let chunker = ContextChunker::new(6).unwrap();
        let chunks = chunker.chunk_documents(&docs);
        assert!(chunks.len() > 1);

        let rebuilt: String = chunks
            .iter()
            .flat_map(|c| c.parts.iter())
            .map(|p| p.text.as_str())
            .collect();
        let original: String = docs.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn oversized_document_splits_at_line_breaks() {
        let line = format!("{}\n", "w".repeat(79));
        let text = line.repeat(20); // 1600 chars, 400 tokens
        let docs = vec![doc("big.drl", text.clone())];
        let chunker = ContextChunker::new(100).unwrap();
        let chunks = chunker.chunk_documents(&docs);

        assert!(chunks.len() > 1);
        let rebuilt: String = chunks
            .iter()
            .flat_map(|c| c.parts.iter())
            .map(|p| p.text.as_str())
            .collect();
        assert_eq!(rebuilt, text);
        for chunk in &chunks {
            assert!(chunk.tokens <= 100);
            assert_eq!(chunk.parts.len(), 1);
            assert_eq!(chunk.parts[0].source, "big.drl");
            // Every segment except the last ends on a line break.
            if chunk.index < chunk.total {
                assert!(chunk.parts[0].text.ends_with('\n'));
            }
        }
    }

    #[test]
    fn single_overlong_line_falls_back_to_character_cut() {
        let text = "z".repeat(1000); // one 250-token line, no breaks
        let docs = vec![doc("blob.gdst", text.clone())];
        let chunker = ContextChunker::new(50).unwrap();
        let chunks = chunker.chunk_documents(&docs);

        assert_eq!(chunks.len(), 5);
        for chunk in &chunks {
            assert!(chunk.tokens <= 50);
        }
        let rebuilt: String = chunks
            .iter()
            .flat_map(|c| c.parts.iter())
            .map(|p| p.text.as_str())
            .collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn oversized_document_flushes_accumulated_chunk_first() {
        let docs = vec![
            doc_of_tokens("small.drl", 10),
            doc_of_tokens("huge.drl", 120),
            doc_of_tokens("tail.drl", 10),
        ];
        let chunker = ContextChunker::new(50).unwrap();
        let chunks = chunker.chunk_documents(&docs);

        assert_eq!(chunks[0].parts[0].source, "small.drl");
        assert_eq!(chunks[0].parts.len(), 1);
        // huge.drl occupies its own run of chunks, then tail.drl follows.
        let last = chunks.last().unwrap();
        assert_eq!(last.parts[0].source, "tail.drl");
        for chunk in &chunks[1..chunks.len() - 1] {
            assert_eq!(chunk.parts[0].source, "huge.drl");
        }
    }
}
