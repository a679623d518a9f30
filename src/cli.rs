//! Interfaz de línea de comandos.
//!
//! Los comandos sobre instancias requieren Postgres (`DATABASE_URL`); `demo`
//! corre el flujo de siniestros completo en memoria.
use std::io::Write;

use clap::{Parser, Subcommand};
use log::{info, warn};
use serde_json::Value;
use steps_claims::provision_claim_workflow;
use steps_core::{Context, ContextRegistry, EngineError, Outcome, SubjectRef, WorkflowRepository, WorkflowService};
use steps_persistence::{build_pool, PgWorkflowRepository, PoolProvider};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::demo;
use crate::errors::AppError;

#[derive(Debug, Parser)]
#[command(name = "stepflow")]
#[command(about = "Workflow engine: steps, statuses and guarded transitions", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Filtro de logs (sobrescribe STEPFLOW_LOG / RUST_LOG)
    #[arg(long, global = true)]
    pub log: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Crea el workflow "Claim Processing"
    ProvisionClaims {
        /// Borra y recrea el workflow si ya existe
        #[arg(long)]
        force: bool,
    },
    /// Inicia (o devuelve la activa) una instancia para un sujeto
    Start {
        #[arg(long)]
        workflow: String,
        #[arg(long)]
        subject_type: String,
        #[arg(long)]
        subject_id: String,
    },
    /// Cambia el status actual y avanza si corresponde
    SetStatus {
        #[arg(long)]
        instance: Uuid,
        #[arg(long)]
        status: String,
        /// Objeto JSON usado para evaluar las condiciones. Contra Postgres no
        /// hay builders registrados: los steps con transiciones condicionadas
        /// (p.ej. "Claim Approval") sólo avanzan si se pasa aquí el sujeto,
        /// como `{"claim": {"amount_approved": 1200.0}}`.
        #[arg(long)]
        context: Option<String>,
    },
    Cancel {
        #[arg(long)]
        instance: Uuid,
    },
    Hold {
        #[arg(long)]
        instance: Uuid,
    },
    Resume {
        #[arg(long)]
        instance: Uuid,
    },
    Show {
        #[arg(long)]
        instance: Uuid,
        #[arg(long)]
        json: bool,
    },
    /// Instancia más reciente de un sujeto
    Find {
        #[arg(long)]
        subject_type: String,
        #[arg(long)]
        subject_id: String,
        #[arg(long)]
        workflow: Option<String>,
    },
    /// Recorre un siniestro de ejemplo en memoria
    Demo,
}

/// Parsea `--context`: debe ser un objeto JSON.
pub fn parse_context(raw: &str) -> Result<Context, AppError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        other => Err(AppError::InvalidInput(format!("context must be a JSON object, got {other}"))),
    }
}

pub fn run(cli: Cli, config: &AppConfig, out: &mut dyn Write) -> Result<(), AppError> {
    match cli.command {
        Command::Demo => demo::run_claim_demo(out).map(|_| ()),
        command => {
            let svc = pg_service(config)?;
            execute(&svc, command, out)
        }
    }
}

fn pg_service(config: &AppConfig) -> Result<WorkflowService<PgWorkflowRepository<PoolProvider>>, AppError> {
    let db = config.database
                   .as_ref()
                   .ok_or_else(|| AppError::Config("DATABASE_URL no definido".into()))?;
    let pool = build_pool(&db.url, db.min_connections, db.max_connections)?;
    info!("connected to postgres (pool max {})", db.max_connections);
    Ok(WorkflowService::new(PgWorkflowRepository::new(PoolProvider { pool }), ContextRegistry::new()))
}

/// Ejecuta un comando contra cualquier repositorio.
pub fn execute<R>(svc: &WorkflowService<R>, command: Command, out: &mut dyn Write) -> Result<(), AppError>
    where R: WorkflowRepository
{
    match command {
        Command::ProvisionClaims { force } => {
            let outcome = provision_claim_workflow(svc.repository(), force)?;
            writeln!(out, "provision: {outcome:?}")?;
        }
        Command::Start { workflow,
                         subject_type,
                         subject_id, } => {
            let subject = SubjectRef::new(subject_type, subject_id);
            match svc.start_instance(&workflow, subject)? {
                Some(instance) => writeln!(out, "{}", instance.id)?,
                None => return Err(EngineError::WorkflowNotFound(workflow).into()),
            }
        }
        Command::SetStatus { instance,
                             status,
                             context, } => {
            let ctx = context.as_deref().map(parse_context).transpose()?;
            if ctx.is_none() && svc.needs_explicit_context(instance)? {
                warn!("instance {instance}: guarded transitions and no --context given");
                writeln!(out, "warning: the current step has guarded transitions; pass --context to let them match")?;
            }
            report(svc, svc.update_status(instance, &status, ctx)?, out)?;
        }
        Command::Cancel { instance } => report(svc, svc.cancel_instance(instance)?, out)?,
        Command::Hold { instance } => report(svc, svc.hold_instance(instance)?, out)?,
        Command::Resume { instance } => report(svc, svc.resume_instance(instance)?, out)?,
        Command::Show { instance, json } => {
            let summary = svc.describe_instance(instance)?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)?;
            } else {
                writeln!(out, "{summary}")?;
            }
        }
        Command::Find { subject_type,
                        subject_id,
                        workflow, } => {
            let subject = SubjectRef::new(subject_type, subject_id);
            match svc.find_instance(&subject, workflow.as_deref())? {
                Some(instance) => writeln!(out, "{}", svc.describe_instance(instance.id)?)?,
                None => writeln!(out, "no instance for {subject}")?,
            }
        }
        Command::Demo => {
            demo::run_claim_demo(out)?;
        }
    }
    Ok(())
}

fn report<R>(svc: &WorkflowService<R>, outcome: Outcome, out: &mut dyn Write) -> Result<(), AppError>
    where R: WorkflowRepository
{
    let summary = svc.describe_instance(outcome.instance.id)?;
    if outcome.applied {
        writeln!(out, "applied: {summary}")?;
        Ok(())
    } else {
        writeln!(out, "unchanged: {summary}")?;
        Err(AppError::NotApplied(format!("instance {}", outcome.instance.id)))
    }
}
