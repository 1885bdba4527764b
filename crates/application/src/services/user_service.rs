use std::sync::Arc;

use domain::{DomainError, PasswordHash, User, UserId, UserRepository, Username};
use uuid::Uuid;

use crate::{clock::Clock, error::ApplicationError, password::PasswordHasher};

#[derive(Debug, Clone)]
pub struct RegisterUserRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AuthenticateUserRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

pub struct UserServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub clock: Arc<dyn Clock>,
}

pub struct UserService {
    deps: UserServiceDependencies,
}

impl UserService {
    pub fn new(deps: UserServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn register(&self, request: RegisterUserRequest) -> Result<User, ApplicationError> {
        let username = Username::parse(request.username)?;
        if request.password.is_empty() {
            return Err(ApplicationError::Domain(DomainError::invalid_argument(
                "password",
                "cannot be empty",
            )));
        }

        if self
            .deps
            .user_repository
            .find_by_username(&username)
            .await?
            .is_some()
        {
            return Err(ApplicationError::Domain(DomainError::UserAlreadyExists));
        }

        let password_hash = self.deps.password_hasher.hash(&request.password).await?;

        let now = self.deps.clock.now();
        let user = User::register(UserId::from(Uuid::new_v4()), username, password_hash, now);

        let stored = self.deps.user_repository.create(user).await?;
        tracing::info!(user_id = %stored.id, username = %stored.username, "用户注册成功");
        Ok(stored)
    }

    pub async fn authenticate(
        &self,
        request: AuthenticateUserRequest,
    ) -> Result<User, ApplicationError> {
        // 用户名非法与用户不存在给出同样的应答，避免枚举
        let username = Username::parse(request.username)
            .map_err(|_| ApplicationError::Domain(DomainError::InvalidCredentials))?;
        let user = self
            .deps
            .user_repository
            .find_by_username(&username)
            .await?
            .ok_or(ApplicationError::Domain(DomainError::InvalidCredentials))?;

        let password_ok = self
            .deps
            .password_hasher
            .verify(&request.password, &user.password_hash)
            .await?;
        if !password_ok {
            return Err(ApplicationError::Domain(DomainError::InvalidCredentials));
        }

        Ok(user)
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<User, ApplicationError> {
        self.deps
            .user_repository
            .find_by_id(UserId::from(user_id))
            .await?
            .ok_or(ApplicationError::Domain(DomainError::UserNotFound))
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<User, ApplicationError> {
        let mut user = self.get_profile(user_id).await?;
        let now = self.deps.clock.now();

        if let Some(new_username) = request.username {
            let new_username = Username::parse(new_username)?;
            if new_username != user.username {
                if self
                    .deps
                    .user_repository
                    .find_by_username(&new_username)
                    .await?
                    .is_some()
                {
                    return Err(ApplicationError::Domain(DomainError::UserAlreadyExists));
                }
                user.rename(new_username, now);
            }
        }

        if let Some(new_password) = request.password {
            if new_password.is_empty() {
                return Err(ApplicationError::Domain(DomainError::invalid_argument(
                    "password",
                    "cannot be empty",
                )));
            }
            let password_hash: PasswordHash =
                self.deps.password_hasher.hash(&new_password).await?;
            user.set_password(password_hash, now);
        }

        let stored = self.deps.user_repository.update(user).await?;
        Ok(stored)
    }

    pub async fn delete_account(&self, user_id: Uuid) -> Result<(), ApplicationError> {
        self.deps
            .user_repository
            .delete(UserId::from(user_id))
            .await?;
        tracing::info!(user_id = %user_id, "用户账号已删除");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use domain::{RepositoryError, RepositoryResult};
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct FakeUserRepository {
        users: StdMutex<HashMap<Uuid, User>>,
    }

    #[async_trait]
    impl UserRepository for FakeUserRepository {
        async fn create(&self, user: User) -> RepositoryResult<User> {
            let mut users = self.users.lock().unwrap();
            if users.values().any(|u| u.username == user.username) {
                return Err(RepositoryError::Conflict);
            }
            users.insert(user.id.into(), user.clone());
            Ok(user)
        }

        async fn update(&self, user: User) -> RepositoryResult<User> {
            let mut users = self.users.lock().unwrap();
            let id: Uuid = user.id.into();
            if !users.contains_key(&id) {
                return Err(RepositoryError::NotFound);
            }
            users.insert(id, user.clone());
            Ok(user)
        }

        async fn delete(&self, id: UserId) -> RepositoryResult<()> {
            self.users
                .lock()
                .unwrap()
                .remove(&id.into())
                .map(|_| ())
                .ok_or(RepositoryError::NotFound)
        }

        async fn find_by_id(&self, id: UserId) -> RepositoryResult<Option<User>> {
            Ok(self.users.lock().unwrap().get(&id.into()).cloned())
        }

        async fn find_by_username(&self, username: &Username) -> RepositoryResult<Option<User>> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .values()
                .find(|u| u.username == *username)
                .cloned())
        }

        async fn count(&self) -> RepositoryResult<u64> {
            Ok(self.users.lock().unwrap().len() as u64)
        }
    }

    /// 测试用明文哈希器，前缀标记代替真实哈希
    struct PlainHasher;

    #[async_trait]
    impl PasswordHasher for PlainHasher {
        async fn hash(
            &self,
            plaintext: &str,
        ) -> Result<PasswordHash, crate::password::PasswordHasherError> {
            Ok(PasswordHash::new(format!("hashed:{plaintext}")).unwrap())
        }

        async fn verify(
            &self,
            plaintext: &str,
            hashed: &PasswordHash,
        ) -> Result<bool, crate::password::PasswordHasherError> {
            Ok(hashed.as_str() == format!("hashed:{plaintext}"))
        }
    }

    fn build_service() -> UserService {
        UserService::new(UserServiceDependencies {
            user_repository: Arc::new(FakeUserRepository::default()),
            password_hasher: Arc::new(PlainHasher),
            clock: Arc::new(crate::clock::SystemClock),
        })
    }

    #[tokio::test]
    async fn register_then_authenticate() {
        let service = build_service();
        let user = service
            .register(RegisterUserRequest {
                username: "alice".to_string(),
                password: "secret".to_string(),
            })
            .await
            .expect("register");
        assert_eq!(user.username.as_str(), "alice");

        let authenticated = service
            .authenticate(AuthenticateUserRequest {
                username: "alice".to_string(),
                password: "secret".to_string(),
            })
            .await
            .expect("authenticate");
        assert_eq!(authenticated.id, user.id);
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let service = build_service();
        let request = RegisterUserRequest {
            username: "alice".to_string(),
            password: "secret".to_string(),
        };
        service.register(request.clone()).await.expect("register");

        let result = service.register(request).await;
        assert!(matches!(
            result,
            Err(ApplicationError::Domain(DomainError::UserAlreadyExists))
        ));
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let service = build_service();
        service
            .register(RegisterUserRequest {
                username: "alice".to_string(),
                password: "secret".to_string(),
            })
            .await
            .expect("register");

        let result = service
            .authenticate(AuthenticateUserRequest {
                username: "alice".to_string(),
                password: "wrong".to_string(),
            })
            .await;
        assert!(matches!(
            result,
            Err(ApplicationError::Domain(DomainError::InvalidCredentials))
        ));
    }

    #[tokio::test]
    async fn rename_does_not_touch_other_fields() {
        let service = build_service();
        let user = service
            .register(RegisterUserRequest {
                username: "alice".to_string(),
                password: "secret".to_string(),
            })
            .await
            .expect("register");

        let updated = service
            .update_profile(
                user.id.into(),
                UpdateProfileRequest {
                    username: Some("alicia".to_string()),
                    password: None,
                },
            )
            .await
            .expect("update");

        assert_eq!(updated.username.as_str(), "alicia");

        // 旧密码仍然有效
        let authenticated = service
            .authenticate(AuthenticateUserRequest {
                username: "alicia".to_string(),
                password: "secret".to_string(),
            })
            .await
            .expect("authenticate after rename");
        assert_eq!(authenticated.id, user.id);
    }
}
