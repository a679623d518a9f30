//! `WorkflowRepository` sobre Postgres.
use diesel::prelude::*;
use log::{debug, error};
use steps_core::{EngineError, Instance, RepositoryTx, StatusFlags, StepStatus, SubjectRef, WorkflowGraph,
                 WorkflowRepository};
use uuid::Uuid;

use super::rows::{InstanceRow, StatusRow, StepRow, TransitionRow, WorkflowRow};
use super::{with_retry, ConnectionProvider};
use crate::error::PersistenceError;
use crate::schema::{workflow_instances, workflow_step_statuses, workflow_steps, workflow_transitions, workflows};

/// Error interno de la closure de transacción: Diesel exige
/// `E: From<diesel::result::Error>`.
enum TxError {
    Engine(EngineError),
    Db(diesel::result::Error),
}

impl From<diesel::result::Error> for TxError {
    fn from(e: diesel::result::Error) -> Self {
        TxError::Db(e)
    }
}

pub struct PgWorkflowRepository<P: ConnectionProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> PgWorkflowRepository<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P: ConnectionProvider> WorkflowRepository for PgWorkflowRepository<P> {
    fn transaction<T, F>(&self, f: F) -> Result<T, EngineError>
        where F: FnOnce(&mut dyn RepositoryTx) -> Result<T, EngineError>
    {
        let mut conn = with_retry(|| self.provider.connection())?;
        let result = conn.build_transaction().read_write().run(|tx_conn| {
                                                               let mut tx = PgTx { conn: tx_conn };
                                                               f(&mut tx).map_err(TxError::Engine)
                                                           });
        match result {
            Ok(value) => Ok(value),
            Err(TxError::Engine(e)) => {
                debug!("transaction rolled back: {e}");
                Err(e)
            }
            Err(TxError::Db(e)) => {
                error!("transaction failed: {e}");
                Err(PersistenceError::from(e).into())
            }
        }
    }
}

struct PgTx<'c> {
    conn: &'c mut PgConnection,
}

/// Mapea un error de Diesel al error del core.
fn db<T>(res: QueryResult<T>) -> Result<T, EngineError> {
    res.map_err(|e| PersistenceError::from(e).into())
}

impl PgTx<'_> {
    fn load_graph(&mut self, row: WorkflowRow) -> Result<WorkflowGraph, EngineError> {
        let steps: Vec<StepRow> = db(workflow_steps::table.filter(workflow_steps::workflow_id.eq(row.id))
                                                          .order(workflow_steps::step_order.asc())
                                                          .load(self.conn))?;
        let step_ids: Vec<Uuid> = steps.iter().map(|s| s.id).collect();
        let statuses: Vec<StatusRow> =
            db(workflow_step_statuses::table.filter(workflow_step_statuses::step_id.eq_any(step_ids))
                                            .order(workflow_step_statuses::name.asc())
                                            .load(self.conn))?;
        let transitions: Vec<TransitionRow> =
            db(workflow_transitions::table.filter(workflow_transitions::workflow_id.eq(row.id))
                                          .load(self.conn))?;
        Ok(WorkflowGraph::from_parts(row.into(),
                                     steps.into_iter().map(Into::into).collect(),
                                     statuses.into_iter().map(Into::into).collect(),
                                     transitions.into_iter().map(Into::into).collect()))
    }
}

impl RepositoryTx for PgTx<'_> {
    fn load_workflow(&mut self, name: &str) -> Result<Option<WorkflowGraph>, EngineError> {
        let row: Option<WorkflowRow> = db(workflows::table.filter(workflows::name.eq(name))
                                                          .first(self.conn)
                                                          .optional())?;
        row.map(|r| self.load_graph(r)).transpose()
    }

    fn load_workflow_by_id(&mut self, id: Uuid) -> Result<Option<WorkflowGraph>, EngineError> {
        let row: Option<WorkflowRow> = db(workflows::table.find(id).first(self.conn).optional())?;
        row.map(|r| self.load_graph(r)).transpose()
    }

    fn insert_workflow(&mut self, graph: &WorkflowGraph) -> Result<(), EngineError> {
        if let Err(mut errors) = graph.validate() {
            return Err(EngineError::Validation(errors.remove(0)));
        }
        db(diesel::insert_into(workflows::table).values(WorkflowRow::from(graph.workflow()))
                                                .execute(self.conn))?;
        let steps: Vec<StepRow> = graph.steps().iter().map(StepRow::from).collect();
        if !steps.is_empty() {
            db(diesel::insert_into(workflow_steps::table).values(&steps).execute(self.conn))?;
        }
        let statuses: Vec<StatusRow> = graph.statuses().iter().map(StatusRow::from).collect();
        if !statuses.is_empty() {
            db(diesel::insert_into(workflow_step_statuses::table).values(&statuses)
                                                                 .execute(self.conn))?;
        }
        let transitions: Vec<TransitionRow> = graph.transitions().iter().map(TransitionRow::from).collect();
        if !transitions.is_empty() {
            db(diesel::insert_into(workflow_transitions::table).values(&transitions)
                                                               .execute(self.conn))?;
        }
        debug!("inserted workflow '{}' ({} steps)", graph.name(), steps.len());
        Ok(())
    }

    fn delete_workflow(&mut self, id: Uuid) -> Result<bool, EngineError> {
        let name: Option<String> = db(workflows::table.find(id)
                                                      .select(workflows::name)
                                                      .first(self.conn)
                                                      .optional())?;
        let Some(name) = name else {
            return Ok(false);
        };
        let in_use: i64 = db(workflow_instances::table.filter(workflow_instances::workflow_id.eq(id))
                                                      .count()
                                                      .get_result(self.conn))?;
        if in_use > 0 {
            return Err(EngineError::WorkflowInUse(name));
        }
        // steps, statuses y transiciones caen por ON DELETE CASCADE.
        db(diesel::delete(workflows::table.find(id)).execute(self.conn))?;
        Ok(true)
    }

    // FOR NO KEY UPDATE choca consigo mismo pero no con el FOR KEY SHARE de
    // las FK, así que sólo espera otro arranque del mismo workflow.
    fn lock_workflow(&mut self, id: Uuid) -> Result<(), EngineError> {
        let locked: Option<Uuid> = db(workflows::table.find(id)
                                                      .select(workflows::id)
                                                      .for_no_key_update()
                                                      .get_result(self.conn)
                                                      .optional())?;
        locked.map(|_| ())
              .ok_or_else(|| EngineError::WorkflowNotFound(id.to_string()))
    }

    fn load_instance(&mut self, id: Uuid) -> Result<Option<Instance>, EngineError> {
        let row: Option<InstanceRow> = db(workflow_instances::table.find(id)
                                                                   .for_update()
                                                                   .get_result(self.conn)
                                                                   .optional())?;
        Ok(row.map(Into::into))
    }

    fn insert_instance(&mut self, instance: &Instance) -> Result<(), EngineError> {
        db(diesel::insert_into(workflow_instances::table).values(InstanceRow::from(instance))
                                                         .execute(self.conn))?;
        Ok(())
    }

    fn save_instance(&mut self, instance: &Instance) -> Result<(), EngineError> {
        let updated = db(diesel::update(workflow_instances::table.find(instance.id))
                             .set((workflow_instances::current_step_id.eq(instance.current_step),
                                   workflow_instances::current_status_id.eq(instance.current_status),
                                   workflow_instances::completed_at.eq(instance.completed_at)))
                             .execute(self.conn))?;
        if updated == 0 {
            return Err(EngineError::InstanceNotFound(instance.id));
        }
        Ok(())
    }

    fn create_status(&mut self,
                     step_id: Uuid,
                     name: &str,
                     description: &str,
                     flags: StatusFlags)
                     -> Result<StepStatus, EngineError> {
        let status = StepStatus { id: Uuid::new_v4(),
                                  step_id,
                                  name: name.to_string(),
                                  description: description.to_string(),
                                  flags };
        db(diesel::insert_into(workflow_step_statuses::table).values(StatusRow::from(&status))
                                                             .execute(self.conn))?;
        Ok(status)
    }

    fn find_instances(&mut self,
                      subject: &SubjectRef,
                      workflow_id: Option<Uuid>)
                      -> Result<Vec<Instance>, EngineError> {
        let mut query = workflow_instances::table.filter(workflow_instances::subject_type.eq(&subject.type_tag))
                                                 .filter(workflow_instances::subject_id.eq(&subject.id))
                                                 .into_boxed();
        if let Some(wf) = workflow_id {
            query = query.filter(workflow_instances::workflow_id.eq(wf));
        }
        let rows: Vec<InstanceRow> = db(query.order((workflow_instances::started_at.desc(),
                                                     workflow_instances::id.asc()))
                                             .load(self.conn))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
