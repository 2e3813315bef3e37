//! Operation endpoint
//!
//! Clients post `{"operationName": ..., "variables": {...}}` to `/query` (or
//! `/graphql`). The name selects one account or product operation and the
//! result comes back as `{"data": {<field>: <result>}}`.

use axum::{body::Bytes, extract::State, Extension, Json};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

use crate::accounts::AuthResult;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::models::{NewProduct, ProductPatch, UserPatch, UserView};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct OperationRequest {
    #[serde(rename = "operationName")]
    operation_name: Option<String>,
    #[serde(default)]
    variables: Value,
}

/// Every operation the endpoint understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Register,
    Login,
    Me,
    GetUser,
    GetUsers,
    CreateUser,
    UpdateUser,
    DeleteUser,
    GetProduct,
    GetProducts,
    CreateProduct,
    UpdateProduct,
    DeleteProduct,
}

impl Operation {
    /// Resolve an operation name, ignoring ASCII case
    pub fn from_name(name: &str) -> Option<Self> {
        let op = match name.to_ascii_lowercase().as_str() {
            "register" => Operation::Register,
            "login" => Operation::Login,
            "me" => Operation::Me,
            "getuser" => Operation::GetUser,
            "getusers" => Operation::GetUsers,
            "createuser" => Operation::CreateUser,
            "updateuser" => Operation::UpdateUser,
            "deleteuser" => Operation::DeleteUser,
            "getproduct" => Operation::GetProduct,
            "getproducts" => Operation::GetProducts,
            "createproduct" => Operation::CreateProduct,
            "updateproduct" => Operation::UpdateProduct,
            "deleteproduct" => Operation::DeleteProduct,
            _ => return None,
        };
        Some(op)
    }

    /// Key of the result inside `data`
    pub fn field(self) -> &'static str {
        match self {
            Operation::Register => "register",
            Operation::Login => "login",
            Operation::Me => "me",
            Operation::GetUser => "user",
            Operation::GetUsers => "users",
            Operation::CreateUser => "createUser",
            Operation::UpdateUser => "updateUser",
            Operation::DeleteUser => "deleteUser",
            Operation::GetProduct => "product",
            Operation::GetProducts => "products",
            Operation::CreateProduct => "createProduct",
            Operation::UpdateProduct => "updateProduct",
            Operation::DeleteProduct => "deleteProduct",
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegisterVars {
    #[serde(default)]
    name: String,
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginVars {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct IdVars {
    id: String,
}

#[derive(Debug, Deserialize)]
struct InputVars<T> {
    input: T,
}

#[derive(Debug, Deserialize)]
struct UpdateVars<T> {
    id: String,
    input: T,
}

#[derive(Debug, Deserialize)]
struct NewUserInput {
    name: String,
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct AuthPayload {
    token: String,
    user: UserView,
}

impl From<AuthResult> for AuthPayload {
    fn from(result: AuthResult) -> Self {
        Self {
            token: result.token,
            user: result.user.into(),
        }
    }
}

fn parse_vars<T: DeserializeOwned>(variables: Value) -> ApiResult<T> {
    serde_json::from_value(variables)
        .map_err(|e| ApiError::Validation(format!("Invalid variables: {}", e)))
}

fn require_credentials(email: &str, password: &str) -> ApiResult<()> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(ApiError::Validation(
            "Email and password are required".to_string(),
        ));
    }
    Ok(())
}

fn to_value<T: Serialize>(value: T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|e| ApiError::Internal(e.to_string()))
}

/// Handle a posted operation
pub async fn handle_operation(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let request: OperationRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::Validation(format!("Invalid request body: {}", e)))?;

    let name = request
        .operation_name
        .ok_or_else(|| ApiError::Validation("operationName is required".to_string()))?;
    let operation = Operation::from_name(&name)
        .ok_or_else(|| ApiError::Validation(format!("Unknown operation: {}", name)))?;

    tracing::debug!(
        operation = ?operation,
        auth_method = ?auth_user.auth_method,
        "Dispatching operation"
    );

    let result = execute(&state, &auth_user, operation, request.variables).await?;

    let mut data = serde_json::Map::new();
    data.insert(operation.field().to_string(), result);
    Ok(Json(json!({ "data": data })))
}

async fn execute(
    state: &AppState,
    auth_user: &AuthUser,
    operation: Operation,
    variables: Value,
) -> ApiResult<Value> {
    let accounts = &state.accounts;

    match operation {
        Operation::Register => {
            let vars: RegisterVars = parse_vars(variables)?;
            require_credentials(&vars.email, &vars.password)?;
            let result = accounts
                .register(&vars.name, &vars.email, &vars.password)
                .await?;
            to_value(AuthPayload::from(result))
        }
        Operation::Login => {
            let vars: LoginVars = parse_vars(variables)?;
            require_credentials(&vars.email, &vars.password)?;
            let result = accounts.login(&vars.email, &vars.password).await?;
            to_value(AuthPayload::from(result))
        }
        Operation::Me => {
            let user_id = auth_user
                .require_user_id()
                .map_err(|_| ApiError::Unauthorized)?;
            let user = accounts.get_user(user_id).await?;
            to_value(UserView::from(user))
        }
        Operation::GetUser => {
            let vars: IdVars = parse_vars(variables)?;
            let user = accounts.get_user(&vars.id).await?;
            to_value(UserView::from(user))
        }
        Operation::GetUsers => {
            let users: Vec<UserView> = accounts
                .list_users()
                .await?
                .into_iter()
                .map(UserView::from)
                .collect();
            to_value(users)
        }
        Operation::CreateUser => {
            let vars: InputVars<NewUserInput> = parse_vars(variables)?;
            let input = vars.input;
            require_credentials(&input.email, &input.password)?;
            let user = accounts
                .create_user(&input.name, &input.email, &input.password)
                .await?;
            to_value(UserView::from(user))
        }
        Operation::UpdateUser => {
            let vars: UpdateVars<UserPatch> = parse_vars(variables)?;
            let user = accounts.update_user(&vars.id, vars.input).await?;
            to_value(UserView::from(user))
        }
        Operation::DeleteUser => {
            let vars: IdVars = parse_vars(variables)?;
            accounts.delete_user(&vars.id).await?;
            Ok(json!({ "deletedUserId": vars.id }))
        }
        Operation::GetProduct => {
            let vars: IdVars = parse_vars(variables)?;
            to_value(state.store.find_product_by_id(&vars.id).await?)
        }
        Operation::GetProducts => to_value(state.store.list_products().await?),
        Operation::CreateProduct => {
            let vars: InputVars<NewProduct> = parse_vars(variables)?;
            let product = state.store.insert_product(vars.input).await?;
            tracing::info!(product_id = %product.id, "Product created");
            to_value(product)
        }
        Operation::UpdateProduct => {
            let vars: UpdateVars<ProductPatch> = parse_vars(variables)?;
            let product = state.store.update_product(&vars.id, vars.input).await?;
            to_value(product)
        }
        Operation::DeleteProduct => {
            let vars: IdVars = parse_vars(variables)?;
            state.store.delete_product(&vars.id).await?;
            tracing::info!(product_id = %vars.id, "Product deleted");
            Ok(json!({ "deletedProductId": vars.id }))
        }
    }
}
