use crate::infra::Services;
use async_trait::async_trait;
use clap::Args;
use elo_cultura::context::{RequestContext, Role};
use elo_cultura::error::AppError;
use elo_cultura::ids::{EditalId, ProjetoId, TenantId, UserId};
use elo_cultura::notifications::{Contact, LogMailer};
use elo_cultura::store::MemoryStore;
use elo_cultura::workflows::edital::{NewEdital, Phase};
use elo_cultura::workflows::evaluation::{AssignmentPair, CriterionScore, NewCriterio};
use elo_cultura::workflows::projects::{
    HabilitationDecision, NewDocument, ProjectDraft, RankingEntry,
};
use elo_cultura::workflows::triage::{
    ChatPrompt, HabilitationSuggestion, ProviderError, TriageModel, TriageResultDetail,
    TriageSettings,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of selectable places in the demo edital
    #[arg(long, default_value_t = 2)]
    pub(crate) vagas: u32,
    /// How many of the sample projects to submit (1-5)
    #[arg(long, default_value_t = 5)]
    pub(crate) projetos: usize,
    /// Print the summary as JSON instead of a report
    #[arg(long)]
    pub(crate) json: bool,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            vagas: 2,
            projetos: 5,
            json: false,
        }
    }
}

struct SampleProject {
    proponente: &'static str,
    titulo: &'static str,
    descricao: &'static str,
    orcamento: f64,
    com_documentos: bool,
}

const SAMPLES: [SampleProject; 5] = [
    SampleProject {
        proponente: "lia",
        titulo: "Cine Clube Itinerante",
        descricao: "Sessões gratuitas de cinema brasileiro em praças de seis bairros, com debates \
            após cada exibição e oficinas de crítica para jovens de escolas públicas.",
        orcamento: 38_000.0,
        com_documentos: true,
    },
    SampleProject {
        proponente: "caio",
        titulo: "Memória do Samba de Roda",
        descricao: "Registro audiovisual de mestres do samba de roda, produção de um documentário \
            de média metragem e acervo digital aberto para pesquisadores e escolas da região.",
        orcamento: 52_500.0,
        com_documentos: true,
    },
    SampleProject {
        proponente: "rita",
        titulo: "Teatro na Feira",
        descricao: "Apresentações curtas de teatro de rua nas feiras livres.",
        orcamento: 18_000.0,
        com_documentos: false,
    },
    SampleProject {
        proponente: "joao",
        titulo: "Cine Clube Itinerante nos Bairros",
        descricao: "Sessões gratuitas de cinema brasileiro em praças de seis bairros, com debates \
            após cada exibição e oficinas de crítica para jovens da rede pública.",
        orcamento: 38_000.0,
        com_documentos: true,
    },
    SampleProject {
        proponente: "nina",
        titulo: "Bordados da Serra",
        descricao: "Oficinas de bordado tradicional com artesãs da zona rural, exposição \
            itinerante das peças e catálogo impresso com a história de cada técnica.",
        orcamento: 27_800.0,
        com_documentos: true,
    },
];

/// Offline stand-in for the language model: dossiers without attachments get a pendency and
/// richer technical descriptions score higher.
pub(crate) struct HeuristicReviewer;

#[async_trait]
impl TriageModel for HeuristicReviewer {
    async fn complete_json(&self, prompt: &ChatPrompt) -> Result<String, ProviderError> {
        let reply = if prompt.user.contains("criterio_id: ") {
            suggest_scores(&prompt.user)
        } else {
            review_documents(&prompt.user)
        };
        Ok(reply.to_string())
    }
}

fn review_documents(user: &str) -> Value {
    if user.contains("- nenhum documento enviado") {
        json!({
            "sugestao": "pendencia",
            "motivo": "Nenhum documento obrigatório foi anexado.",
            "docs_completos": false,
            "problemas": ["Plano de trabalho ausente", "Planilha orçamentária ausente"]
        })
    } else {
        json!({
            "sugestao": "habilitado",
            "motivo": "Plano de trabalho e planilha orçamentária anexados.",
            "docs_completos": true,
            "problemas": []
        })
    }
}

fn suggest_scores(user: &str) -> Value {
    let palavras = user
        .lines()
        .find_map(|line| line.strip_prefix("Descrição técnica: "))
        .map(|text| text.split_whitespace().count())
        .unwrap_or(0);
    let riqueza = (palavras as f64 / 25.0).min(1.0);

    let avaliacoes: Vec<Value> = user
        .lines()
        .filter_map(|line| line.strip_prefix("- criterio_id: "))
        .filter_map(|rest| {
            let mut parts = rest.split(" | ");
            let criterio_id = parts.next()?;
            let faixa = parts.nth(1)?.strip_prefix("nota de ")?;
            let (minima, maxima) = faixa.split_once(" a ")?;
            let minima: f64 = minima.trim().parse().ok()?;
            let maxima: f64 = maxima.trim().parse().ok()?;
            let nota = minima + (maxima - minima) * (0.4 + 0.6 * riqueza);
            Some(json!({
                "criterio_id": criterio_id,
                "nota": (nota * 10.0).round() / 10.0,
                "justificativa": format!("Descrição técnica com {palavras} palavras."),
                "confianca": 0.6
            }))
        })
        .collect();

    json!({ "avaliacoes": avaliacoes })
}

#[derive(Debug, Serialize)]
pub(crate) struct TriageLine {
    pub(crate) protocolo: String,
    pub(crate) titulo: String,
    pub(crate) sugestao: HabilitationSuggestion,
    pub(crate) nota_agregada: f64,
    pub(crate) irregularidades: usize,
    pub(crate) similaridade_maxima: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct DemoSummary {
    pub(crate) edital: String,
    pub(crate) fase: Phase,
    pub(crate) notificacoes: usize,
    pub(crate) triagem: Vec<TriageLine>,
    pub(crate) ranking: Vec<RankingEntry>,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let summary = run_scenario(&args).await?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&summary).map_err(AppError::workflow)?;
        println!("{rendered}");
        return Ok(());
    }

    println!("Edital {} ({})", summary.edital, summary.fase.label());
    println!("Notificações enfileiradas: {}", summary.notificacoes);
    println!();
    println!("Triagem assistida por IA");
    for line in &summary.triagem {
        println!(
            "  {} | {:<36} | {:<11} | nota {:>5.2} | alertas {} (similaridade {:.2})",
            line.protocolo,
            line.titulo,
            format!("{:?}", line.sugestao).to_lowercase(),
            line.nota_agregada,
            line.irregularidades,
            line.similaridade_maxima
        );
    }
    println!();
    println!("Classificação final");
    for entry in &summary.ranking {
        let posicao = entry
            .posicao
            .map(|posicao| format!("{posicao:>2}º"))
            .unwrap_or_else(|| " --".to_string());
        let nota = entry
            .nota_final
            .map(|nota| format!("{nota:>5.2}"))
            .unwrap_or_else(|| "  -  ".to_string());
        println!(
            "  {posicao} | {:<36} | {nota} | {}",
            entry.titulo,
            entry.status_selecao.label()
        );
    }

    Ok(())
}

/// Walk one edital from creation to resultado final: submissions, AI triage, evaluation seeded
/// with the triage suggestions, habilitation and ranking.
pub(crate) async fn run_scenario(args: &DemoArgs) -> Result<DemoSummary, AppError> {
    let services = Services::new(
        Arc::new(MemoryStore::new()),
        Arc::new(HeuristicReviewer),
        Arc::new(LogMailer),
        TriageSettings::default(),
    );
    let tenant_id = TenantId::new();
    let gestor = RequestContext::new(tenant_id, UserId::new(), Role::Gestor);
    let avaliador = RequestContext::new(tenant_id, UserId::new(), Role::Avaliador);

    let edital = services
        .editais
        .create(
            &gestor,
            NewEdital {
                numero: "001/2025".to_string(),
                titulo: "Fomento à Cultura Local".to_string(),
                descricao: "Seleção de projetos culturais de base comunitária".to_string(),
                janelas: BTreeMap::new(),
                vagas: args.vagas,
            },
        )
        .await
        .map_err(AppError::workflow)?;

    let rubric = [
        ("Mérito cultural", 3.0),
        ("Impacto comunitário", 2.0),
        ("Viabilidade orçamentária", 1.0),
    ];
    services
        .evaluation
        .service
        .replace_criteria(
            &gestor,
            edital.id,
            rubric
                .iter()
                .enumerate()
                .map(|(index, (descricao, peso))| NewCriterio {
                    descricao: descricao.to_string(),
                    nota_minima: 0.0,
                    nota_maxima: 10.0,
                    peso: *peso,
                    ordem: index as u32 + 1,
                })
                .collect(),
        )
        .await
        .map_err(AppError::workflow)?;

    let mut notificacoes = advance_until(&services, &gestor, edital.id, Phase::Inscricao).await?;

    let mut projetos = Vec::new();
    for sample in SAMPLES.iter().take(args.projetos.clamp(1, SAMPLES.len())) {
        let proponente = RequestContext::new(tenant_id, UserId::new(), Role::Proponente);
        services.store.register_contact(
            tenant_id,
            Contact {
                user_id: proponente.actor_id,
                email: format!("{}@exemplo.org.br", sample.proponente),
                nome: sample.proponente.to_string(),
            },
        );

        let projeto = services
            .projects
            .submit(
                &proponente,
                edital.id,
                ProjectDraft {
                    titulo: sample.titulo.to_string(),
                    resumo: format!("{}: proposta de circulação cultural", sample.titulo),
                    descricao_tecnica: sample.descricao.to_string(),
                    orcamento_total: sample.orcamento,
                    cronograma_execucao: "Seis meses a partir da assinatura do termo".to_string(),
                },
            )
            .await
            .map_err(AppError::workflow)?;

        if sample.com_documentos {
            for (nome_arquivo, tipo_mime, categoria) in [
                ("plano_de_trabalho.pdf", "application/pdf", "plano_trabalho"),
                (
                    "planilha_orcamentaria.xlsx",
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                    "orcamento",
                ),
            ] {
                services
                    .projects
                    .attach_document(
                        &proponente,
                        projeto.id,
                        NewDocument {
                            nome_arquivo: nome_arquivo.to_string(),
                            tipo_mime: tipo_mime.to_string(),
                            categoria: categoria.to_string(),
                        },
                    )
                    .await
                    .map_err(AppError::workflow)?;
            }
        }
        projetos.push(projeto);
    }

    services
        .triage
        .run_to_completion(&gestor, edital.id)
        .await
        .map_err(AppError::workflow)?;
    let report = services
        .triage
        .latest_results(&gestor, edital.id)
        .await
        .map_err(AppError::workflow)?;
    let by_project: HashMap<ProjetoId, &TriageResultDetail> = report
        .resultados
        .iter()
        .map(|detail| (detail.resultado.projeto_id, detail))
        .collect();

    notificacoes += advance_until(&services, &gestor, edital.id, Phase::AvaliacaoTecnica).await?;

    services
        .evaluation
        .matrix
        .save(
            &gestor,
            edital.id,
            projetos
                .iter()
                .map(|projeto| AssignmentPair {
                    avaliador_id: avaliador.actor_id,
                    projeto_id: projeto.id,
                })
                .collect(),
        )
        .await
        .map_err(AppError::workflow)?;
    let avaliacoes = services
        .evaluation
        .matrix
        .current(&gestor, edital.id)
        .await
        .map_err(AppError::workflow)?;
    for avaliacao in avaliacoes {
        let Some(detail) = by_project.get(&avaliacao.projeto_id) else {
            continue;
        };
        let notas = detail
            .notas
            .iter()
            .map(|nota| CriterionScore {
                criterio_id: nota.criterio_id,
                nota: Some(nota.nota_sugerida),
                comentario: Some(nota.justificativa.clone()),
            })
            .collect();
        services
            .evaluation
            .service
            .save_scores(
                &avaliador,
                avaliacao.id,
                notas,
                Some("Parecer alinhado à triagem automática".to_string()),
            )
            .await
            .map_err(AppError::workflow)?;
        services
            .evaluation
            .service
            .finalize(&avaliador, avaliacao.id)
            .await
            .map_err(AppError::workflow)?;
    }

    notificacoes += advance_until(&services, &gestor, edital.id, Phase::Habilitacao).await?;

    for projeto in &projetos {
        let Some(detail) = by_project.get(&projeto.id) else {
            continue;
        };
        let (decision, motivo) = match detail.resultado.sugestao_habilitacao {
            HabilitationSuggestion::Habilitado => (HabilitationDecision::Habilitado, None),
            _ => (
                HabilitationDecision::Inabilitado,
                Some(detail.resultado.motivo_habilitacao.clone()),
            ),
        };
        services
            .projects
            .decide_habilitation(&gestor, projeto.id, decision, motivo)
            .await
            .map_err(AppError::workflow)?;
    }

    let ranking = services
        .projects
        .compute_ranking(&gestor, edital.id)
        .await
        .map_err(AppError::workflow)?;

    notificacoes += advance_until(&services, &gestor, edital.id, Phase::ResultadoFinal).await?;
    services.drain().await;

    let triagem = projetos
        .iter()
        .filter_map(|projeto| {
            let detail = by_project.get(&projeto.id)?;
            Some(TriageLine {
                protocolo: projeto.numero_protocolo.clone(),
                titulo: projeto.titulo.clone(),
                sugestao: detail.resultado.sugestao_habilitacao,
                nota_agregada: detail.resultado.nota_agregada,
                irregularidades: detail.resultado.irregularidades.len(),
                similaridade_maxima: detail.resultado.similaridade_maxima,
            })
        })
        .collect();

    Ok(DemoSummary {
        edital: edital.numero,
        fase: Phase::ResultadoFinal,
        notificacoes,
        triagem,
        ranking,
    })
}

async fn advance_until(
    services: &Services,
    ctx: &RequestContext,
    edital_id: EditalId,
    target: Phase,
) -> Result<usize, AppError> {
    let mut queued = 0;
    loop {
        let edital = services
            .editais
            .get(ctx, edital_id)
            .await
            .map_err(AppError::workflow)?;
        if edital.status >= target {
            return Ok(queued);
        }
        let advance = services
            .editais
            .advance(ctx, edital_id)
            .await
            .map_err(AppError::workflow)?;
        queued += advance.notificacoes_enfileiradas;
    }
}
