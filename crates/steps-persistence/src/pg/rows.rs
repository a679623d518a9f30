//! Filas Diesel y su conversión desde/hacia el modelo del core.
//! El orden de los campos sigue el de las columnas en `schema.rs`.
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use steps_core::{Instance, StatusFlags, Step, StepStatus, SubjectRef, Transition, Workflow};
use uuid::Uuid;

use crate::schema::{workflow_instances, workflow_step_statuses, workflow_steps, workflow_transitions, workflows};

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = workflows)]
pub struct WorkflowRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = workflow_steps)]
pub struct StepRow {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub name: String,
    pub description: String,
    pub step_order: i32,
    pub is_initial: bool,
    pub is_final: bool,
}

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = workflow_step_statuses)]
pub struct StatusRow {
    pub id: Uuid,
    pub step_id: Uuid,
    pub name: String,
    pub description: String,
    pub is_default: bool,
    pub is_completion: bool,
    pub is_cancellation: bool,
    pub is_on_hold: bool,
}

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = workflow_transitions)]
pub struct TransitionRow {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub from_step_id: Uuid,
    pub to_step_id: Uuid,
    pub guard_condition: String,
    pub priority: i32,
    pub description: String,
}

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = workflow_instances)]
pub struct InstanceRow {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub current_step_id: Option<Uuid>,
    pub current_status_id: Option<Uuid>,
    pub subject_type: String,
    pub subject_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<WorkflowRow> for Workflow {
    fn from(r: WorkflowRow) -> Self {
        Workflow { id: r.id,
                   name: r.name,
                   description: r.description,
                   created_at: r.created_at }
    }
}

impl From<&Workflow> for WorkflowRow {
    fn from(w: &Workflow) -> Self {
        Self { id: w.id,
               name: w.name.clone(),
               description: w.description.clone(),
               created_at: w.created_at }
    }
}

impl From<StepRow> for Step {
    fn from(r: StepRow) -> Self {
        Step { id: r.id,
               workflow_id: r.workflow_id,
               name: r.name,
               description: r.description,
               order: r.step_order,
               is_initial: r.is_initial,
               is_final: r.is_final }
    }
}

impl From<&Step> for StepRow {
    fn from(s: &Step) -> Self {
        Self { id: s.id,
               workflow_id: s.workflow_id,
               name: s.name.clone(),
               description: s.description.clone(),
               step_order: s.order,
               is_initial: s.is_initial,
               is_final: s.is_final }
    }
}

impl From<StatusRow> for StepStatus {
    fn from(r: StatusRow) -> Self {
        StepStatus { id: r.id,
                     step_id: r.step_id,
                     name: r.name,
                     description: r.description,
                     flags: StatusFlags { is_default: r.is_default,
                                          is_completion: r.is_completion,
                                          is_cancellation: r.is_cancellation,
                                          is_on_hold: r.is_on_hold } }
    }
}

impl From<&StepStatus> for StatusRow {
    fn from(s: &StepStatus) -> Self {
        Self { id: s.id,
               step_id: s.step_id,
               name: s.name.clone(),
               description: s.description.clone(),
               is_default: s.flags.is_default,
               is_completion: s.flags.is_completion,
               is_cancellation: s.flags.is_cancellation,
               is_on_hold: s.flags.is_on_hold }
    }
}

impl From<TransitionRow> for Transition {
    fn from(r: TransitionRow) -> Self {
        Transition { id: r.id,
                     workflow_id: r.workflow_id,
                     from_step: r.from_step_id,
                     to_step: r.to_step_id,
                     condition: r.guard_condition,
                     priority: r.priority,
                     description: r.description }
    }
}

impl From<&Transition> for TransitionRow {
    fn from(t: &Transition) -> Self {
        Self { id: t.id,
               workflow_id: t.workflow_id,
               from_step_id: t.from_step,
               to_step_id: t.to_step,
               guard_condition: t.condition.clone(),
               priority: t.priority,
               description: t.description.clone() }
    }
}

impl From<InstanceRow> for Instance {
    fn from(r: InstanceRow) -> Self {
        Instance { id: r.id,
                   workflow_id: r.workflow_id,
                   current_step: r.current_step_id,
                   current_status: r.current_status_id,
                   subject: SubjectRef::new(r.subject_type, r.subject_id),
                   started_at: r.started_at,
                   completed_at: r.completed_at }
    }
}

impl From<&Instance> for InstanceRow {
    fn from(i: &Instance) -> Self {
        Self { id: i.id,
               workflow_id: i.workflow_id,
               current_step_id: i.current_step,
               current_status_id: i.current_status,
               subject_type: i.subject.type_tag.clone(),
               subject_id: i.subject.id.clone(),
               started_at: i.started_at,
               completed_at: i.completed_at }
    }
}
