use actix_web::{web, HttpRequest, HttpResponse};
use log::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::AppOrderService;

pub const ADMIN_ID_HEADER: &str = "X-Admin-Id";

fn admin_id(req: &HttpRequest) -> Result<String, AppError> {
    req.headers()
        .get(ADMIN_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::BadRequest(format!("{} header is required", ADMIN_ID_HEADER)))
}

/// DELETE /admin/orders/{id}
///
/// Soft-deletes the order and records an `OrderDeleted` outbox event in the
/// same transaction. The admin id is kept on the event for audit.
#[utoipa::path(
    delete,
    path = "/admin/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-Admin-Id" = String, Header, description = "Id of the admin performing the deletion"),
    ),
    responses(
        (status = 204, description = "Order soft-deleted"),
        (status = 400, description = "Missing X-Admin-Id header"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order already deleted"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "admin"
)]
pub async fn delete_order(
    service: web::Data<AppOrderService>,
    path: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let admin_id = admin_id(&req)?;

    info!("Admin {} is deleting order {}", admin_id, order_id);

    web::block(move || service.delete_order(order_id, &admin_id)).await??;

    Ok(HttpResponse::NoContent().finish())
}
