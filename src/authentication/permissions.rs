use crate::{jwt::SessionData, schema::UserRole};

const USER_ACTIONS: &[ActionType] = &[
    ActionType::CreateRecipes,
    ActionType::ManageOwnRecipes,
    ActionType::ManageOwnFavorites,
    ActionType::ManageOwnShoppingCart,
    ActionType::ManageOwnSubscriptions,
];

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (UserRole::User, USER_ACTIONS),
    (
        UserRole::Admin,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnFavorites,
            ActionType::ManageOwnShoppingCart,
            ActionType::ManageOwnSubscriptions,
            ActionType::ManageAllRecipes,
        ],
    ),
];

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    CreateRecipes,

    ManageOwnRecipes,
    ManageOwnFavorites,
    ManageOwnShoppingCart,
    ManageOwnSubscriptions,

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

    fn session(role: UserRole) -> SessionData {
        SessionData {
            user_id: 1,
            username: String::from("cook"),
            role,
            is_admin: role == UserRole::Admin,
        }
    }

    #[test]
    fn users_manage_only_their_own_things() {
        let user = session(UserRole::User);

        assert!(ActionType::CreateRecipes.authenticate(&user));
        assert!(ActionType::ManageOwnFavorites.authenticate(&user));
        assert!(ActionType::ManageOwnSubscriptions.authenticate(&user));
        assert!(!ActionType::ManageAllRecipes.authenticate(&user));
    }

    #[test]
    fn admins_manage_every_recipe() {
        let admin = session(UserRole::Admin);

        assert!(ActionType::ManageAllRecipes.authenticate(&admin));
        assert!(ActionType::ManageOwnShoppingCart.authenticate(&admin));
    }
}
