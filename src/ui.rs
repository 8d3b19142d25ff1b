//! Interface de terminal do jobmatch: spinners e saída colorida.
//!
//! Usa as crates `indicatif` para o spinner exibido enquanto o matching roda
//! e `console` para estilização com cores. O [`MatchProgress`] acompanha
//! visualmente a espera entre o disparo e a releitura dos jobs.

use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::matching::Candidate;
use crate::model::{Job, JobStatus};
use crate::observer::{Observation, ObservedState};

/// Indicador visual de progresso para um disparo de matching no terminal.
///
/// Exibe um spinner animado durante a espera e mensagens coloridas para
/// jobs atribuídos (verde), ainda pendentes (amarelo) e removidos (vermelho).
pub struct MatchProgress {
    // Barra de progresso/spinner do indicatif.
    pb: ProgressBar,
    // Estilo verde para jobs atribuídos.
    green: Style,
    // Estilo vermelho para jobs que sumiram.
    red: Style,
    // Estilo amarelo para jobs ainda pendentes.
    yellow: Style,
}

impl MatchProgress {
    /// Inicia o spinner com a mensagem fornecida.
    pub fn start(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Para o spinner sem imprimir nada (usado em caso de erro).
    pub fn abandon(&self) {
        self.pb.finish_and_clear();
    }

    /// Finaliza o spinner e exibe o resultado de cada job observado.
    pub fn complete(&self, observation: &Observation) {
        self.pb.finish_and_clear();
        println!(
            "Matching triggered (run {}): {}",
            observation.ack.run_id, observation.ack.message
        );
        if observation.jobs.is_empty() {
            println!("  {} No eligible jobs to watch", self.yellow.apply_to("•"));
            return;
        }
        for job in &observation.jobs {
            let title = job.title.as_deref().unwrap_or("");
            match &job.state {
                ObservedState::Matched { agent_id } => println!(
                    "  {} {} {title} → agent {agent_id}",
                    self.green.apply_to("✓"),
                    job.job_id
                ),
                ObservedState::StillPending => println!(
                    "  {} {} {title} still unassigned",
                    self.yellow.apply_to("…"),
                    job.job_id
                ),
                ObservedState::Missing => println!(
                    "  {} {} no longer exists",
                    self.red.apply_to("✗"),
                    job.job_id
                ),
            }
        }
        println!(
            "{} of {} watched jobs matched. Results are read after a fixed delay; run again if a pass was still in progress.",
            observation.matched(),
            observation.jobs.len()
        );
    }
}

/// Imprime a lista de jobs em formato de tabela com o status colorido.
pub fn print_jobs(jobs: &[Job]) {
    if jobs.is_empty() {
        println!("No jobs found.");
        return;
    }
    for job in jobs {
        let agent = job.agent_id.as_deref().unwrap_or("-");
        println!(
            "{:<36}  {:<10}  {:<5}  {:<36}  {}",
            job.id,
            status_style(job.status).apply_to(job.status),
            if job.auto_assign { "auto" } else { "-" },
            agent,
            job.title
        );
    }
}

/// Imprime um job único, usado após uma mudança de status.
pub fn print_job(job: &Job) {
    println!(
        "{} {} [{}]",
        status_style(job.status).apply_to("●"),
        job.title,
        status_style(job.status).apply_to(job.status)
    );
}

/// Imprime o ranking de candidatos com a decomposição da pontuação.
pub fn print_candidates(candidates: &[Candidate]) {
    if candidates.is_empty() {
        println!("No candidate agents (job may be assigned, not pending, or nobody scores above zero).");
        return;
    }
    let bold = Style::new().bold();
    for (rank, c) in candidates.iter().enumerate() {
        println!(
            "{:>2}. {} {:<36} {} (category {}, tags {} × {}, auto-accept {})",
            rank + 1,
            bold.apply_to(format!("{:>3}", c.score)),
            c.agent_id,
            c.agent_name,
            c.breakdown.category,
            c.breakdown.shared_tags,
            crate::matching::SHARED_TAG_POINTS,
            c.breakdown.auto_accept
        );
    }
}

fn status_style(status: JobStatus) -> Style {
    match status {
        JobStatus::Pending => Style::new().yellow(),
        JobStatus::Running => Style::new().blue(),
        JobStatus::Completed => Style::new().green(),
        JobStatus::Failed => Style::new().red(),
    }
}
