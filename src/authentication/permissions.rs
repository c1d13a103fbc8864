use crate::{jwt::SessionData, schema::UserRole};

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (
        UserRole::User,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnFavorites,
            ActionType::ManageOwnShoppingCart,
            ActionType::ManageOwnSubscriptions,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnFavorites,
            ActionType::ManageOwnShoppingCart,
            ActionType::ManageOwnSubscriptions,
            ActionType::ManageAllRecipes,
            ActionType::ManageUsers,
        ],
    ),
];

#[derive(Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    CreateRecipes,

    ManageOwnRecipes,
    ManageOwnFavorites,
    ManageOwnShoppingCart,
    ManageOwnSubscriptions,

    ManageUsers,
    ManageAllRecipes,
}

impl ActionType {
    pub fn authenticate(self, session: &SessionData) -> bool {
        let user_uid = &session.user_uid;

        ACTION_TABLE
            .iter()
            .find_map(|(uid, actions)| {
                if user_uid != uid {
                    return None;
                }

                Some(actions.contains(&self))
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(uid: UserRole) -> SessionData {
        SessionData {
            user_id: 1,
            username: String::from("anna"),
            is_admin: uid == UserRole::Admin,
            user_uid: uid,
        }
    }

    #[test]
    fn every_role_may_author_recipes() {
        assert!(ActionType::CreateRecipes.authenticate(&session(UserRole::User)));
        assert!(ActionType::CreateRecipes.authenticate(&session(UserRole::Admin)));
    }

    #[test]
    fn only_admins_manage_foreign_recipes() {
        assert!(!ActionType::ManageAllRecipes.authenticate(&session(UserRole::User)));
        assert!(ActionType::ManageAllRecipes.authenticate(&session(UserRole::Admin)));
    }

    #[test]
    fn session_authenticate_wraps_the_table() {
        assert!(session(UserRole::User)
            .authenticate(ActionType::ManageOwnFavorites)
            .is_ok());
        assert!(session(UserRole::User)
            .authenticate(ActionType::ManageUsers)
            .is_err());
    }
}
