use crate::{jwt::SessionData, schema::UserRole};

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (
        UserRole::User,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnRelations,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnRelations,
            ActionType::ManageAllRecipes,
        ],
    ),
];

#[derive(Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub enum ActionType {
    CreateRecipes,

    ManageOwnRecipes,
    ManageOwnRelations,

    ManageAllRecipes,
}

impl ActionType {
    pub fn authenticate(self, session: &SessionData) -> bool {
        ACTION_TABLE
            .iter()
            .find(|(role, _)| *role == session.role)
            .is_some_and(|(_, actions)| actions.contains(&self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(user_id: i32, role: UserRole) -> SessionData {
        SessionData {
            user_id,
            username: format!("user{user_id}"),
            role,
        }
    }

    #[test]
    fn users_manage_only_their_own_recipes() {
        let owner = session(1, UserRole::User);
        let stranger = session(2, UserRole::User);

        assert!(owner.can_manage(1, ActionType::ManageOwnRecipes, ActionType::ManageAllRecipes));
        assert!(!stranger.can_manage(1, ActionType::ManageOwnRecipes, ActionType::ManageAllRecipes));
    }

    #[test]
    fn admins_manage_every_recipe() {
        let admin = session(3, UserRole::Admin);

        assert!(admin.can_manage(1, ActionType::ManageOwnRecipes, ActionType::ManageAllRecipes));
        assert!(ActionType::ManageAllRecipes.authenticate(&admin));
    }
}
