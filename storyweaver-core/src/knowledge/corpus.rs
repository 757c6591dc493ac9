use super::SourceDocument;

const PASSAGES: [&str; 5] = [
    "The old house stood on a windswept hill, its windows like vacant eyes staring out at the stormy sea.",
    "A feeling of intense paranoia washed over him as he realized he was the only one who remembered the missing photograph.",
    "The ancient prophecy spoke of a hidden key that would unlock a forgotten power.",
    "Despite the joyous celebration, a subtle undercurrent of sadness lingered in her smile.",
    "The mirror reflected not his own face, but a distorted and menacing visage.",
];

/// The built-in reference passages, with ids `doc_0` through `doc_4`.
pub fn default_corpus() -> Vec<SourceDocument> {
    PASSAGES
        .iter()
        .enumerate()
        .map(|(i, text)| SourceDocument::new(format!("doc_{i}"), *text))
        .collect()
}
