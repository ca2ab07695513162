use std::fmt::Write;

use super::model::ChatPrompt;
use crate::workflows::evaluation::Criterio;
use crate::workflows::projects::{Documento, Projeto};

const HABILITATION_SYSTEM: &str = "Você é um analista de editais culturais municipais. \
Avalie se a documentação enviada por um projeto está completa para a habilitação. \
Responda somente com um objeto JSON no formato \
{\"sugestao\": \"habilitado\" | \"inabilitado\" | \"pendencia\", \"motivo\": string, \
\"docs_completos\": boolean, \"problemas\": [string]}.";

const SCORING_SYSTEM: &str = "Você é um parecerista técnico de editais culturais. \
Atribua uma nota a cada critério de avaliação, respeitando os limites mínimo e máximo. \
Responda somente com um objeto JSON no formato \
{\"avaliacoes\": [{\"criterio_id\": string, \"nota\": number, \"justificativa\": string, \
\"confianca\": number entre 0 e 1}]}, com uma entrada por critério.";

pub fn habilitation_prompt(projeto: &Projeto, documentos: &[Documento]) -> ChatPrompt {
    let mut user = project_summary(projeto);
    user.push_str("\nDocumentos enviados:\n");
    if documentos.is_empty() {
        user.push_str("- nenhum documento enviado\n");
    }
    for documento in documentos {
        let _ = writeln!(
            user,
            "- {} ({}, categoria: {})",
            documento.nome_arquivo, documento.tipo_mime, documento.categoria
        );
    }

    ChatPrompt {
        system: HABILITATION_SYSTEM.to_string(),
        user,
    }
}

pub fn scoring_prompt(projeto: &Projeto, criterios: &[Criterio]) -> ChatPrompt {
    let mut user = project_summary(projeto);
    user.push_str("\nCritérios de avaliação:\n");
    for criterio in criterios {
        let _ = writeln!(
            user,
            "- criterio_id: {} | {} | nota de {} a {} | peso {}",
            criterio.id,
            criterio.descricao,
            criterio.nota_minima,
            criterio.nota_maxima,
            criterio.peso
        );
    }

    ChatPrompt {
        system: SCORING_SYSTEM.to_string(),
        user,
    }
}

fn project_summary(projeto: &Projeto) -> String {
    let mut summary = String::new();
    let _ = writeln!(summary, "Protocolo: {}", projeto.numero_protocolo);
    let _ = writeln!(summary, "Título: {}", projeto.titulo);
    let _ = writeln!(summary, "Resumo: {}", projeto.resumo);
    let _ = writeln!(summary, "Descrição técnica: {}", projeto.descricao_tecnica);
    let _ = writeln!(summary, "Orçamento total: R$ {:.2}", projeto.orcamento_total);
    if !projeto.cronograma_execucao.trim().is_empty() {
        let _ = writeln!(summary, "Cronograma: {}", projeto.cronograma_execucao);
    }
    summary
}
