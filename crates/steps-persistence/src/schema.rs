//! Esquema Diesel escrito a mano; debe coincidir con `migrations/`.

diesel::table! {
    workflows (id) {
        id -> Uuid,
        name -> Text,
        description -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    workflow_steps (id) {
        id -> Uuid,
        workflow_id -> Uuid,
        name -> Text,
        description -> Text,
        step_order -> Int4,
        is_initial -> Bool,
        is_final -> Bool,
    }
}

diesel::table! {
    workflow_step_statuses (id) {
        id -> Uuid,
        step_id -> Uuid,
        name -> Text,
        description -> Text,
        is_default -> Bool,
        is_completion -> Bool,
        is_cancellation -> Bool,
        is_on_hold -> Bool,
    }
}

diesel::table! {
    workflow_transitions (id) {
        id -> Uuid,
        workflow_id -> Uuid,
        from_step_id -> Uuid,
        to_step_id -> Uuid,
        guard_condition -> Text,
        priority -> Int4,
        description -> Text,
    }
}

diesel::table! {
    workflow_instances (id) {
        id -> Uuid,
        workflow_id -> Uuid,
        current_step_id -> Nullable<Uuid>,
        current_status_id -> Nullable<Uuid>,
        subject_type -> Text,
        subject_id -> Text,
        started_at -> Timestamptz,
        completed_at -> Nullable<Timestamptz>,
    }
}

diesel::joinable!(workflow_steps -> workflows (workflow_id));
diesel::joinable!(workflow_step_statuses -> workflow_steps (step_id));
diesel::joinable!(workflow_instances -> workflows (workflow_id));

diesel::allow_tables_to_appear_in_same_query!(
    workflows,
    workflow_steps,
    workflow_step_statuses,
    workflow_transitions,
    workflow_instances,
);
