use super::types::State;

fn allowed_transitions(src: State) -> &'static [State] {
    match src {
        State::Pending => &[State::Scheduled],
        State::Scheduled => &[State::Scheduled, State::Running, State::Failed],
        State::Running => &[
            State::Running,
            State::Completed,
            State::Failed,
            State::Scheduled,
        ],
        State::Completed => &[],
        State::Failed => &[State::Scheduled],
    }
}

pub fn valid_state_transition(src: State, dst: State) -> bool {
    allowed_transitions(src).contains(&dst)
}
