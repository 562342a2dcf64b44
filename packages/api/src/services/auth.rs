use chrono::NaiveDate;
use tracing::{error, info, warn};

use store::models::{Credentials, Profile, Registration, TherapistProfile, UserRole};
use store::validation::{validate_credentials, validate_registration};

use super::Platform;
use crate::backend::{insert_row, select_row, AuthUser, Query, Table};
use crate::error::ApiError;
use crate::models::{AuthTokens, CurrentUser};

impl Platform {
    /// Create the identity, then the profile rows. Profile write failures are
    /// logged and the account is still returned.
    pub async fn register(
        &self,
        form: Registration,
        today: NaiveDate,
    ) -> Result<CurrentUser, ApiError> {
        validate_registration(&form, today)?;

        let session = self.backend.sign_up(form.email.trim(), &form.password).await?;
        let token = session.access_token();
        let profile = form.profile(session.user.id);

        if let Err(e) =
            insert_row::<Profile, _>(self.backend(), Table::Profiles, &profile, token).await
        {
            error!("Failed to create profile for {}: {}", session.user.id, e);
        }

        if let Some(therapist) = form.therapist_profile(session.user.id) {
            if let Err(e) = insert_row::<TherapistProfile, _>(
                self.backend(),
                Table::TherapistProfiles,
                &therapist,
                token,
            )
            .await
            {
                error!("Failed to create therapist profile for {}: {}", session.user.id, e);
            }
        }

        info!("Registered {} as {}", session.user.id, profile.user_type);
        Ok(CurrentUser::from_profile(
            &session.user.email,
            &profile,
            session.tokens,
        ))
    }

    pub async fn login(&self, credentials: Credentials) -> Result<CurrentUser, ApiError> {
        validate_credentials(&credentials)?;
        let session = self
            .backend
            .sign_in(credentials.email.trim(), &credentials.password)
            .await?;
        let user = self
            .load_user(&session.user, session.tokens)
            .await?;
        info!("User {} signed in", user.id);
        Ok(user)
    }

    /// Revoke the access token. The local session is dropped by the caller
    /// whatever happens here.
    pub async fn logout(&self, user: &CurrentUser) {
        if let Some(token) = user.token() {
            if let Err(e) = self.backend.sign_out(token).await {
                warn!("Sign-out for {} failed: {}", user.id, e);
            }
        }
    }

    /// Re-read the signed-in user from the backend, failing with
    /// `Unauthorized` once the token has been revoked.
    pub async fn refresh_user(&self, user: &CurrentUser) -> Result<CurrentUser, ApiError> {
        let token = user.token().ok_or(ApiError::Unauthorized)?;
        let identity = self.backend.get_user(token).await?;
        self.load_user(&identity, user.tokens.clone()).await
    }

    /// Trade the stored refresh token for a new token pair. The profile part
    /// of the user is kept as is. Fails with `Unauthorized` when the refresh
    /// token is missing or no longer accepted.
    pub async fn renew_session(&self, user: &CurrentUser) -> Result<CurrentUser, ApiError> {
        let refresh_token = user.refresh_token().ok_or(ApiError::Unauthorized)?;
        let session = self.backend.refresh_session(refresh_token).await?;
        if session.user.id != user.id {
            warn!("Refreshed session for {} belongs to {}", user.id, session.user.id);
            return Err(ApiError::Unauthorized);
        }
        info!("Renewed session for {}", user.id);
        Ok(CurrentUser {
            tokens: session.tokens,
            ..user.clone()
        })
    }

    async fn load_user(
        &self,
        identity: &AuthUser,
        tokens: Option<AuthTokens>,
    ) -> Result<CurrentUser, ApiError> {
        let query = Query::new().eq("id", identity.id);
        let token = tokens.as_ref().map(|t| t.access_token.as_str());
        let profile: Option<Profile> =
            select_row(self.backend(), Table::Profiles, &query, token).await?;

        Ok(match profile {
            Some(profile) => CurrentUser::from_profile(&identity.email, &profile, tokens),
            None => {
                warn!("No profile row for {}, treating as patient", identity.id);
                CurrentUser {
                    id: identity.id,
                    email: identity.email.clone(),
                    full_name: None,
                    role: UserRole::Patient,
                    tokens,
                }
            }
        })
    }
}
