pub mod candidate_dto;
