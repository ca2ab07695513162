//! Pairwise duplicate detection across the projects of one edital.

use serde::Serialize;

use super::domain::FlagKind;
use crate::ids::ProjetoId;

/// Budgets closer than this are considered the same amount.
const BUDGET_EPSILON: f64 = 0.005;

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityInput {
    pub projeto_id: ProjetoId,
    pub titulo: String,
    pub texto: String,
    pub orcamento: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityFlag {
    pub projeto_id: ProjetoId,
    pub projeto_similar_id: ProjetoId,
    pub tipo: FlagKind,
    pub similaridade: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityDetector {
    threshold: f64,
}

impl SimilarityDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Compare every pair once. Each flag lands on the later project in `inputs` order and
    /// points back at the earlier one.
    pub fn detect(&self, inputs: &[SimilarityInput]) -> Vec<SimilarityFlag> {
        let normalized: Vec<String> = inputs
            .iter()
            .map(|input| normalize(&format!("{} {}", input.titulo, input.texto)))
            .collect();

        let mut flags = Vec::new();
        for later in 1..inputs.len() {
            for earlier in 0..later {
                let (left, right) = (&normalized[earlier], &normalized[later]);
                if !left.is_empty() && !right.is_empty() {
                    let score = strsim::sorensen_dice(left, right);
                    if score >= self.threshold {
                        flags.push(SimilarityFlag {
                            projeto_id: inputs[later].projeto_id,
                            projeto_similar_id: inputs[earlier].projeto_id,
                            tipo: FlagKind::TextoSimilar,
                            similaridade: score,
                        });
                    }
                }

                if same_budget(inputs[earlier].orcamento, inputs[later].orcamento) {
                    flags.push(SimilarityFlag {
                        projeto_id: inputs[later].projeto_id,
                        projeto_similar_id: inputs[earlier].projeto_id,
                        tipo: FlagKind::OrcamentoDuplicado,
                        similaridade: 1.0,
                    });
                }
            }
        }
        flags
    }
}

/// Similarity of two free texts after normalisation, in `[0, 1]`.
pub fn text_similarity(left: &str, right: &str) -> f64 {
    strsim::sorensen_dice(&normalize(left), &normalize(right))
}

fn same_budget(left: f64, right: f64) -> bool {
    left > 0.0 && right > 0.0 && (left - right).abs() < BUDGET_EPSILON
}

/// Lowercase, punctuation replaced by spaces, whitespace collapsed.
fn normalize(raw: &str) -> String {
    raw.chars()
        .map(|ch| {
            if ch.is_alphanumeric() {
                ch.to_lowercase().next().unwrap_or(ch)
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(titulo: &str, texto: &str, orcamento: f64) -> SimilarityInput {
        SimilarityInput {
            projeto_id: ProjetoId::new(),
            titulo: titulo.to_string(),
            texto: texto.to_string(),
            orcamento,
        }
    }

    #[test]
    fn normalisation_ignores_case_and_punctuation() {
        assert_eq!(normalize("  Festa  JUNINA, do Bairro!! "), "festa junina do bairro");
        assert_eq!(text_similarity("Festa Junina!", "festa   junina"), 1.0);
    }

    #[test]
    fn pair_scoring_exactly_the_threshold_is_flagged() {
        let first = input("Oficina de teatro", "para jovens da periferia", 10_000.0);
        let second = input("Oficina de dança", "para jovens do centro", 12_500.0);
        let score = text_similarity(
            &format!("{} {}", first.titulo, first.texto),
            &format!("{} {}", second.titulo, second.texto),
        );
        assert!(score > 0.0 && score < 1.0);

        let flags = SimilarityDetector::new(score).detect(&[first.clone(), second.clone()]);

        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].projeto_id, second.projeto_id);
        assert_eq!(flags[0].projeto_similar_id, first.projeto_id);
        assert_eq!(flags[0].tipo, FlagKind::TextoSimilar);
        assert_eq!(flags[0].similaridade, score);

        let stricter = SimilarityDetector::new(score + 1e-9).detect(&[first, second]);
        assert!(stricter.is_empty());
    }

    #[test]
    fn identical_budgets_are_flagged_on_the_later_project() {
        let first = input("Sarau literário", "leituras mensais", 8_000.0);
        let second = input("Circo itinerante", "apresentações em escolas rurais", 8_000.001);
        let third = input("Mostra de cinema", "sessões gratuitas", 0.0);

        let flags = SimilarityDetector::new(0.95).detect(&[first.clone(), second.clone(), third]);

        assert_eq!(
            flags,
            vec![SimilarityFlag {
                projeto_id: second.projeto_id,
                projeto_similar_id: first.projeto_id,
                tipo: FlagKind::OrcamentoDuplicado,
                similaridade: 1.0,
            }]
        );
    }

    #[test]
    fn empty_texts_are_never_compared() {
        let flags =
            SimilarityDetector::new(0.0).detect(&[input("", "", 1.0), input("", "!!", 2.0)]);
        assert!(flags.is_empty());
    }
}
