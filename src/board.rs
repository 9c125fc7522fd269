use crate::models::{Job, Stage, Status};

/// One kanban column and the cards in it, in collection order.
pub struct Column<'a> {
    pub stage: Stage,
    pub jobs: Vec<&'a Job>,
}

/// Splits the jobs into the four pipeline columns. Cards whose status is not a
/// pipeline stage are not shown on the board.
pub fn columns<'a>(jobs: &'a [Job], query: &str) -> [Column<'a>; 4] {
    Stage::ALL.map(|stage| Column {
        stage,
        jobs: jobs
            .iter()
            .filter(|j| j.status.stage() == Some(stage) && j.matches_query(query))
            .collect(),
    })
}

/// Decides what dropping a card onto `target` does. `None` means the card
/// landed outside every column. Yields the stage to move to, or `None` when the
/// drop changes nothing: no target, a target that is not a column, or the
/// column the card is already in. No ordering is enforced between stages.
pub fn drop_target(current: &Status, target: Option<&str>) -> Option<Stage> {
    let stage = target?.parse::<Stage>().ok()?;
    if current.stage() == Some(stage) {
        return None;
    }
    Some(stage)
}

/// The column to the left (`-1`) or right (`+1`) of `stage`, if any.
pub fn neighbour(stage: Stage, step: isize) -> Option<Stage> {
    let idx = stage.index().checked_add_signed(step)?;
    Stage::ALL.get(idx).copied()
}
