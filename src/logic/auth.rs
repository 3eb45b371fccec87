use crate::logic::ApiError;
use crate::model::{Credentials, User};
use crate::store::Dataset;

/// Resolve the acting user for a mutating request
pub fn authenticate(dataset: &Dataset, credentials: Option<&Credentials>) -> Result<User, ApiError> {
    let Some(credentials) = credentials else {
        return Err(ApiError::Unauthorized(
            "Couldn't authenticate you".to_string(),
        ));
    };
    match dataset.find_user_by_login(&credentials.login) {
        Some(user) if user.verify_password(&credentials.password) => Ok(user.clone()),
        _ => {
            log::warn!("rejected credentials for login '{}'", credentials.login);
            Err(ApiError::Unauthorized(
                "Couldn't authenticate you".to_string(),
            ))
        }
    }
}

/// Users who keep their edits private may not upload data
pub fn require_public(user: &User) -> Result<(), ApiError> {
    if user.data_public {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "You must make your edits public to upload new data".to_string(),
        ))
    }
}

/// Authenticate and check the user may edit, in that order
pub fn editor(dataset: &Dataset, credentials: Option<&Credentials>) -> Result<User, ApiError> {
    let user = authenticate(dataset, credentials)?;
    require_public(&user)?;
    Ok(user)
}
