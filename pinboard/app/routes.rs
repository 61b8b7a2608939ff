use diesel::sqlite::SqliteConnection;

use crate::context::AppCtx;
use crate::models::Board;
use crate::repo;
use crate::views::BoardSummary;
use crate::web::error::AppError;
use crate::web::Service;

mod auth;
mod boards;
mod home;
mod pins;
mod profiles;

pub fn build_route(ctx: &AppCtx) -> Service<AppCtx> {
    Service::builder()
        .add_function_route(home::home)
        .add_function_route(auth::login)
        .add_function_route(auth::register)
        .add_function_route(auth::logout)
        .add_function_route(profiles::upload_avatar)
        .add_function_route(profiles::own_profile)
        .add_function_route(profiles::edit_profile)
        .add_function_route(profiles::user_profile)
        .add_function_route(pins::upload_pin)
        .add_function_route(pins::delete_pin)
        .add_function_route(pins::edit_pin_form)
        .add_function_route(pins::edit_pin)
        .add_function_route(boards::upload_board)
        .add_function_route(boards::add_to_board)
        .add_function_route(boards::remove_from_board)
        .add_function_route(boards::board_detail)
        .add_function_route(boards::delete_board)
        .finish(ctx)
}

fn board_summaries(
    conn: &mut SqliteConnection,
    list: &[Board],
) -> Result<Vec<BoardSummary>, AppError> {
    let ids: Vec<i32> = list.iter().map(|b| b.id).collect();
    let owners = repo::boards::owner_names(conn, list)?;
    let counts = repo::boards::pin_counts(conn, &ids)?;
    Ok(BoardSummary::list(list, &owners, &counts))
}
