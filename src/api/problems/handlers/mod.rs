mod assignments;
mod generation;
mod manage;
mod testcases;

pub(super) use assignments::{
    assign_users, list_assigned_users, list_problem_submissions, unassign_user,
};
pub(super) use generation::generate_testcases;
pub(super) use manage::{
    create_problem, delete_problem, get_problem, list_assigned_problems, list_problems,
    update_problem,
};
pub(super) use testcases::{add_testcase, delete_testcase, list_testcases, update_testcase};
