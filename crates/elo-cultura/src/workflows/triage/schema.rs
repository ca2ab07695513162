//! Strict decoding of model answers. Each field that is missing or has the wrong type falls back
//! to a documented default instead of failing the whole answer; only a reply that is not a JSON
//! object at all is rejected.

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::domain::HabilitationSuggestion;
use crate::ids::CriterioId;
use crate::workflows::evaluation::Criterio;

/// Confidence recorded when a score had to be synthesised.
pub const FALLBACK_CONFIDENCE: f64 = 0.3;
const DEFAULT_CONFIDENCE: f64 = 0.5;
const MISSING_MOTIVE: &str = "Motivo não informado pela análise automática.";
const MISSING_JUSTIFICATION: &str = "Justificativa não informada pela análise automática.";

#[derive(Debug, Clone, PartialEq)]
pub struct HabilitationAnalysis {
    pub sugestao: HabilitationSuggestion,
    pub motivo: String,
    pub docs_completos: bool,
    pub problemas: Vec<String>,
}

impl HabilitationAnalysis {
    /// Outcome recorded when the model could not be asked or its answer was unusable.
    pub fn unavailable(reason: impl std::fmt::Display) -> Self {
        Self {
            sugestao: HabilitationSuggestion::Pendencia,
            motivo: format!("Análise automática indisponível: {reason}"),
            docs_completos: false,
            problemas: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuggestedScore {
    pub criterio_id: CriterioId,
    pub nota: f64,
    pub justificativa: String,
    pub confianca: f64,
}

impl SuggestedScore {
    /// Midpoint of the criterion range with low confidence and a diagnostic justification.
    pub fn fallback(criterio: &Criterio, reason: impl std::fmt::Display) -> Self {
        Self {
            criterio_id: criterio.id,
            nota: criterio.midpoint(),
            justificativa: format!("Nota sugerida automaticamente ({reason})."),
            confianca: FALLBACK_CONFIDENCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("resposta não é JSON válido: {0}")]
    InvalidJson(String),
    #[error("resposta JSON não é um objeto")]
    NotAnObject,
}

fn parse_object(raw: &str) -> Result<Map<String, Value>, DecodeError> {
    match serde_json::from_str::<Value>(raw.trim()) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(DecodeError::NotAnObject),
        Err(err) => Err(DecodeError::InvalidJson(err.to_string())),
    }
}

/// Decode `{sugestao, motivo, docs_completos, problemas}`.
pub fn decode_habilitation(raw: &str) -> Result<HabilitationAnalysis, DecodeError> {
    let object = parse_object(raw)?;

    let sugestao = object
        .get("sugestao")
        .and_then(Value::as_str)
        .and_then(HabilitationSuggestion::parse)
        .unwrap_or(HabilitationSuggestion::Pendencia);
    let motivo = object
        .get("motivo")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or(MISSING_MOTIVE)
        .to_string();
    let docs_completos = object
        .get("docs_completos")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let problemas = object
        .get("problemas")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(HabilitationAnalysis {
        sugestao,
        motivo,
        docs_completos,
        problemas,
    })
}

/// Decode `{avaliacoes: [{criterio_id, nota, justificativa, confianca}]}` into exactly one score
/// per criterion, in criterion order. Scores are clamped into the criterion range; criteria the
/// model skipped get [`SuggestedScore::fallback`].
pub fn decode_scores(
    raw: &str,
    criterios: &[Criterio],
) -> Result<Vec<SuggestedScore>, DecodeError> {
    let object = parse_object(raw)?;
    let entries = object
        .get("avaliacoes")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let mut decoded: HashMap<CriterioId, (f64, String, f64)> = HashMap::new();
    for entry in entries {
        let Some(entry) = entry.as_object() else {
            continue;
        };
        let Some(criterio_id) = entry
            .get("criterio_id")
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse::<CriterioId>().ok())
        else {
            continue;
        };
        let Some(nota) = entry
            .get("nota")
            .and_then(Value::as_f64)
            .filter(|nota| nota.is_finite())
        else {
            continue;
        };
        let justificativa = entry
            .get("justificativa")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .unwrap_or(MISSING_JUSTIFICATION)
            .to_string();
        let confianca = entry
            .get("confianca")
            .and_then(Value::as_f64)
            .filter(|value| value.is_finite())
            .map(|value| value.clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_CONFIDENCE);

        decoded
            .entry(criterio_id)
            .or_insert((nota, justificativa, confianca));
    }

    Ok(criterios
        .iter()
        .map(|criterio| match decoded.remove(&criterio.id) {
            Some((nota, justificativa, confianca)) => SuggestedScore {
                criterio_id: criterio.id,
                nota: criterio.clamp(nota),
                justificativa,
                confianca,
            },
            None => SuggestedScore::fallback(criterio, "critério ausente na resposta da IA"),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::ids::{EditalId, TenantId};

    fn criterio(minima: f64, maxima: f64) -> Criterio {
        Criterio {
            id: CriterioId::new(),
            tenant_id: TenantId::new(),
            edital_id: EditalId::new(),
            descricao: "Relevância cultural".to_string(),
            nota_minima: minima,
            nota_maxima: maxima,
            peso: 1.0,
            ordem: 1,
        }
    }

    #[test]
    fn habilitation_fields_fall_back_individually() {
        let raw = json!({
            "sugestao": "talvez",
            "docs_completos": "sim",
            "problemas": ["RG ilegível", 3, ""]
        })
        .to_string();
        let analysis = decode_habilitation(&raw).expect("object decodes");

        assert_eq!(analysis.sugestao, HabilitationSuggestion::Pendencia);
        assert_eq!(analysis.motivo, MISSING_MOTIVE);
        assert!(!analysis.docs_completos);
        assert_eq!(analysis.problemas, vec!["RG ilegível".to_string()]);
    }

    #[test]
    fn habilitation_accepts_a_well_formed_answer() {
        let raw = json!({
            "sugestao": "Habilitado",
            "motivo": "Documentação completa",
            "docs_completos": true,
            "problemas": []
        })
        .to_string();
        let analysis = decode_habilitation(&raw).expect("object decodes");

        assert_eq!(analysis.sugestao, HabilitationSuggestion::Habilitado);
        assert!(analysis.docs_completos);
        assert!(analysis.problemas.is_empty());
    }

    #[test]
    fn non_object_answers_are_rejected() {
        assert_eq!(decode_habilitation("[1, 2]"), Err(DecodeError::NotAnObject));
        assert!(matches!(
            decode_habilitation("not json"),
            Err(DecodeError::InvalidJson(_))
        ));
    }

    #[test]
    fn scores_are_clamped_and_missing_criteria_use_the_midpoint() {
        let relevancia = criterio(0.0, 10.0);
        let viabilidade = criterio(0.0, 4.0);
        let raw = format!(
            r#"{{"avaliacoes": [
                {{"criterio_id": "{}", "nota": 14, "justificativa": "Excelente", "confianca": 1.7}},
                {{"criterio_id": "{}", "nota": 2, "justificativa": "Duplicada"}}
            ]}}"#,
            relevancia.id, relevancia.id
        );

        let scores =
            decode_scores(&raw, &[relevancia.clone(), viabilidade.clone()]).expect("decodes");

        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].nota, 10.0);
        assert_eq!(scores[0].confianca, 1.0);
        assert_eq!(scores[0].justificativa, "Excelente");
        assert_eq!(scores[1].criterio_id, viabilidade.id);
        assert_eq!(scores[1].nota, 2.0);
        assert_eq!(scores[1].confianca, FALLBACK_CONFIDENCE);
    }

    #[test]
    fn string_scores_are_not_coerced() {
        let relevancia = criterio(0.0, 10.0);
        let raw = format!(
            r#"{{"avaliacoes": [{{"criterio_id": "{}", "nota": "9"}}]}}"#,
            relevancia.id
        );

        let scores = decode_scores(&raw, std::slice::from_ref(&relevancia)).expect("decodes");

        assert_eq!(scores[0].nota, 5.0);
        assert_eq!(scores[0].confianca, FALLBACK_CONFIDENCE);
    }
}
